//! The example user service.
//!
//! Exercises every shape the runtime knows: nested records, nullable records,
//! homogeneous and fixed-length sequences, and timestamps.

use chrono::DateTime;
use chrono::Duration;
use chrono::FixedOffset;
use dynrpc::record;
use dynrun::Service;

pub const SERVICE_NAME: &str = "UserService";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Address {
    pub home: String,
    pub office: String,
}

record!(Address {
    home => "HomeAddr",
    office => "OfficeAddr",
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub address: Address,
    pub hobbies: Vec<String>,
    pub favourite_hobbies: [String; 3],
    pub friends: Vec<User>,
    pub friend_refs: Vec<Option<Box<User>>>,
    pub family: Option<Vec<User>>,
    pub team: Option<Box<[User; 3]>>,
}

record!(User {
    id => "ID",
    name => "Name",
    age => "Age",
    address => "Address",
    hobbies => "HobbiesSlice",
    favourite_hobbies => "HobbiesArr",
    friends => "SliceStruct",
    friend_refs => "SlicePtrStruct",
    family => "PtrSliceStruct",
    team => "PtrArrayStruct",
});

fn age_of(user: &Option<Box<User>>) -> i64 {
    user.as_ref().map_or(0, |u| u.age)
}

/// Builds the service; register it as [`SERVICE_NAME`].
pub fn user_service() -> Service {
    Service::new()
        .method("GetUserById", |id: i64| {
            Some(Box::new(User { id, name: "Guobin".into(), age: 40, ..User::default() }))
        })
        .method("Add", |a: i64, b: i64| a.wrapping_add(b))
        .method("GrowUpPointer", |user: Option<Box<User>>| {
            user.map(|mut u| {
                u.age += 1;
                u
            })
        })
        .method("GrowUpStruct", |mut user: User| {
            user.age += 1;
            user
        })
        .method("Sum", |nums: Vec<i64>| nums.iter().sum::<i64>())
        .method("SumPointer", |nums: Option<Vec<i64>>| nums.unwrap_or_default().iter().sum::<i64>())
        .method("SumUserAgePointer", |users: Vec<Option<Box<User>>>| {
            users.iter().map(age_of).sum::<i64>()
        })
        .method("SumUserAgeStruct", |users: Vec<User>| users.iter().map(|u| u.age).sum::<i64>())
        .method("TestArrStruct", |users: [User; 3]| users.iter().map(|u| u.age).sum::<i64>())
        .method("TestArrPointer", |users: [Option<Box<User>>; 3]| {
            users.iter().map(age_of).sum::<i64>()
        })
        .method("TestTime", |t: DateTime<FixedOffset>| t + Duration::hours(1))
        .method("TestTimePtr", |t: Option<DateTime<FixedOffset>>| t.map(|t| t + Duration::hours(1)))
        .method("EmptyIn", || "guobin".to_string())
        .method("EmptyOut", |_name: String| ())
        .method("EmptyInAndOut", || ())
}

use crate::*;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

// ============================================================================
//  TEST RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
struct Address {
    home: String,
    office: String,
}

crate::record!(Address {
    home => "HomeAddr",
    office => "OfficeAddr",
});

#[derive(Debug, Clone, PartialEq, Default)]
struct Person {
    id: i64,
    name: String,
    age: u8,
    address: Address,
    tags: Vec<String>,
    sons: Vec<Person>,
    born: DateTime<Utc>,
    scores: [i32; 3],
}

crate::record!(Person {
    id => "ID",
    name => "Name",
    age => "Age",
    address => "Address",
    tags => "Tags",
    sons => "Sons",
    born => "Born",
    scores => "Scores",
});

fn lenient() -> Policy {
    Policy::default()
}

fn prim(kind: Kind) -> Shape {
    Shape::Primitive(kind)
}

fn coerce_ok(value: Value, shape: &Shape) -> Typed {
    coerce(&value, shape, &lenient()).expect("coercion should succeed")
}

fn coerce_err(value: Value, shape: &Shape) -> CoercionError {
    coerce(&value, shape, &lenient()).expect_err("coercion should fail")
}

// ============================================================================
//  PRIMITIVES
// ============================================================================

#[test]
fn numbers_convert_between_kinds() {
    assert_eq!(coerce_ok(Value::Int(7), &prim(Kind::I32)), Typed::I32(7));
    assert_eq!(coerce_ok(Value::Int(7), &prim(Kind::F64)), Typed::F64(7.0));
    assert_eq!(coerce_ok(Value::Float(2.9), &prim(Kind::I64)), Typed::I64(2));
    assert_eq!(coerce_ok(Value::Float(-2.9), &prim(Kind::I16)), Typed::I16(-2));
    assert_eq!(coerce_ok(Value::Float(1.5), &prim(Kind::F32)), Typed::F32(1.5));
}

#[test]
fn bools_are_zero_or_one() {
    assert_eq!(coerce_ok(Value::Bool(true), &prim(Kind::U8)), Typed::U8(1));
    assert_eq!(coerce_ok(Value::Bool(false), &prim(Kind::F64)), Typed::F64(0.0));
    assert_eq!(coerce_ok(Value::Int(5), &prim(Kind::Bool)), Typed::Bool(true));
    assert_eq!(coerce_ok(Value::Float(0.0), &prim(Kind::Bool)), Typed::Bool(false));
}

#[test]
fn narrowing_wraps_like_a_cast() {
    assert_eq!(coerce_ok(Value::Int(300), &prim(Kind::U8)), Typed::U8(44));
    assert_eq!(coerce_ok(Value::Int(-1), &prim(Kind::U32)), Typed::U32(u32::MAX));
    assert_eq!(coerce_ok(Value::Float(1e20), &prim(Kind::I32)), Typed::I32(i32::MAX));
}

#[test]
fn strings_only_from_strings() {
    assert_eq!(coerce_ok(Value::from("hi"), &prim(Kind::Str)), Typed::Str("hi".into()));

    let err = coerce_err(Value::Int(1), &prim(Kind::Str));
    assert_eq!(
        err,
        CoercionError::Mismatch { path: "$".into(), expected: "string".into(), found: "int".into() }
    );

    assert!(matches!(coerce_err(Value::from("12"), &prim(Kind::I64)), CoercionError::Mismatch { .. }));
    assert!(matches!(coerce_err(Value::Null, &prim(Kind::Bool)), CoercionError::Mismatch { .. }));
}

#[test]
fn primitive_round_trip_is_identity() {
    let cases = [
        (Value::Int(-42), prim(Kind::I64)),
        (Value::Int(42), prim(Kind::U16)),
        (Value::Float(0.25), prim(Kind::F64)),
        (Value::Bool(true), prim(Kind::Bool)),
        (Value::from("text"), prim(Kind::Str)),
    ];

    for (value, shape) in cases {
        let typed = coerce_ok(value.clone(), &shape);
        assert_eq!(serialize(&typed), value, "round trip through {}", shape);
    }
}

// ============================================================================
//  TEMPORAL AND OPTIONAL
// ============================================================================

#[test]
fn timestamps_parse_rfc3339() {
    let typed = coerce_ok(Value::from("2024-01-02T03:04:05+02:00"), &Shape::Temporal);
    let Typed::Time(t) = &typed else { panic!("expected a timestamp, got {:?}", typed) };
    assert_eq!(t.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 1, 2, 1, 4, 5).unwrap());
    assert_eq!(serialize(&typed), Value::from("2024-01-02T03:04:05+02:00"));

    let utc = coerce_ok(Value::from("2024-01-02T03:04:05Z"), &Shape::Temporal);
    assert_eq!(serialize(&utc), Value::from("2024-01-02T03:04:05Z"));
}

#[test]
fn bad_timestamps_fail() {
    assert!(matches!(
        coerce_err(Value::from("yesterday"), &Shape::Temporal),
        CoercionError::BadTimestamp { .. }
    ));
    assert!(matches!(coerce_err(Value::Int(0), &Shape::Temporal), CoercionError::Mismatch { .. }));
}

#[test]
fn optional_null_is_absent() {
    let shape = Shape::optional(prim(Kind::I64));
    assert_eq!(coerce_ok(Value::Null, &shape), Typed::Optional(None));
    assert_eq!(
        coerce_ok(Value::Int(3), &shape),
        Typed::Optional(Some(Box::new(Typed::I64(3))))
    );
    assert_eq!(serialize(&Typed::Optional(None)), Value::Null);
}

// ============================================================================
//  RECORDS AND SEQUENCES
// ============================================================================

#[test]
fn missing_fields_take_zero_values() {
    let typed = coerce_ok(Value::map([("Name", Value::from("x"))]), &Person::shape());
    let person = Person::from_typed(typed).unwrap();

    assert_eq!(person.name, "x");
    assert_eq!(person.id, 0);
    assert_eq!(person.address, Address::default());
    assert!(person.sons.is_empty());
    assert_eq!(person.born, Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(person.scores, [0, 0, 0]);
}

#[test]
fn zero_time_serializes_as_year_one() {
    assert_eq!(serialize(&Shape::Temporal.zero()), Value::from("0001-01-01T00:00:00Z"));
}

#[test]
fn unknown_keys_fail() {
    let value = Value::map([("Name", Value::from("x")), ("Nickname", Value::from("y"))]);
    let err = coerce_err(value, &Person::shape());
    assert_eq!(
        err,
        CoercionError::UnknownField { path: "$".into(), record: "Person", field: "Nickname".into() }
    );
}

#[test]
fn errors_name_the_nested_path() {
    let value = Value::map([
        ("Address", Value::map([("HomeAddr", Value::Int(1))])),
    ]);
    let err = coerce_err(value, &Person::shape());
    assert_eq!(
        err,
        CoercionError::Mismatch {
            path: "$.Address.HomeAddr".into(),
            expected: "string".into(),
            found: "int".into(),
        }
    );

    let value = Value::map([("Tags", Value::Seq(vec![Value::from("a"), Value::Null]))]);
    let err = coerce_err(value, &Person::shape());
    assert!(err.to_string().starts_with("$.Tags[1]:"), "{}", err);
}

#[test]
fn record_requires_a_map() {
    let err = coerce_err(Value::seq([1, 2]), &Person::shape());
    assert_eq!(
        err,
        CoercionError::Mismatch { path: "$".into(), expected: "record Person".into(), found: "seq".into() }
    );
}

#[test]
fn seq_coerces_each_element() {
    let shape = Shape::seq(prim(Kind::U32));
    assert_eq!(
        coerce_ok(Value::seq([1, 2, 3]), &shape),
        Typed::List(vec![Typed::U32(1), Typed::U32(2), Typed::U32(3)])
    );
    assert_eq!(coerce_ok(Value::Seq(vec![]), &shape), Typed::List(vec![]));
    assert!(matches!(coerce_err(Value::Null, &shape), CoercionError::Mismatch { .. }));
}

#[test]
fn fixed_seq_lenient_pads_and_truncates() {
    let shape = Shape::fixed(prim(Kind::I64), 3);

    assert_eq!(
        coerce_ok(Value::seq([1]), &shape),
        Typed::Array(vec![Typed::I64(1), Typed::I64(0), Typed::I64(0)])
    );
    assert_eq!(
        coerce_ok(Value::seq([1, 2, 3, 4, 5]), &shape),
        Typed::Array(vec![Typed::I64(1), Typed::I64(2), Typed::I64(3)])
    );
}

#[test]
fn fixed_seq_exact_rejects_other_lengths() {
    let shape = Shape::fixed(prim(Kind::I64), 2);
    let strict = Policy::strict();

    assert!(coerce(&Value::seq([1, 2]), &shape, &strict).is_ok());
    assert_eq!(
        coerce(&Value::seq([1, 2, 3]), &shape, &strict),
        Err(CoercionError::LengthMismatch { path: "$".into(), expected: 2, found: 3 })
    );
}

#[test]
fn deep_nesting_is_refused() {
    let mut shape = prim(Kind::I64);
    let mut value = Value::Int(1);
    for _ in 0..(coerce::MAX_RECURSION_DEPTH + 5) {
        shape = Shape::seq(shape);
        value = Value::Seq(vec![value]);
    }

    assert!(matches!(coerce_err(value, &shape), CoercionError::TooDeep { .. }));
}

#[test]
fn coerce_args_checks_count_and_position() {
    let shapes = [prim(Kind::I64), prim(Kind::Str)];

    let typed = coerce_args(&[Value::Int(1), Value::from("a")], &shapes, &lenient()).unwrap();
    assert_eq!(typed, vec![Typed::I64(1), Typed::Str("a".into())]);

    assert!(matches!(
        coerce_args(&[Value::Int(1)], &shapes, &lenient()),
        Err(CoercionError::LengthMismatch { expected: 2, found: 1, .. })
    ));

    let err = coerce_args(&[Value::Int(1), Value::Int(2)], &shapes, &lenient()).unwrap_err();
    assert!(err.to_string().starts_with("arg[1]:"), "{}", err);
}

// ============================================================================
//  SHAPED BRIDGE
// ============================================================================

#[test]
fn records_round_trip_through_the_wire_form() {
    let person = Person {
        id: 9,
        name: "ann".into(),
        age: 31,
        address: Address { home: "h".into(), office: "o".into() },
        tags: vec!["a".into(), "b".into()],
        sons: vec![Person { id: 10, name: "kid".into(), ..Person::default() }],
        born: Utc.with_ymd_and_hms(1993, 5, 6, 7, 8, 9).unwrap(),
        scores: [1, 2, 3],
    };

    let wire = serialize(&person.clone().into_typed());
    let Value::Map(map) = &wire else { panic!("records serialize to maps") };
    assert_eq!(map.get("Name"), Some(&Value::from("ann")));
    assert_eq!(map.get("Born"), Some(&Value::from("1993-05-06T07:08:09Z")));

    let back = Person::from_typed(coerce_ok(wire, &Person::shape())).unwrap();
    assert_eq!(back, person);
}

#[test]
fn recursive_records_have_finite_shapes() {
    let shape = Person::shape();
    assert_eq!(shape.describe(), "record Person");

    let fields = convert::fields_of::<Person>();
    let sons = fields.iter().find(|f| f.name == "Sons").unwrap();
    assert_eq!(sons.shape, Shape::seq(Person::shape()));
}

#[test]
fn option_box_is_a_nullable_record() {
    assert_eq!(<Option<Box<Address>>>::shape(), Shape::optional(Address::shape()));

    let typed = coerce_ok(Value::Null, &<Option<Box<Address>>>::shape());
    assert_eq!(<Option<Box<Address>>>::from_typed(typed).unwrap(), None);
}

#[test]
fn serialize_as_rejects_mismatched_results() {
    assert!(serialize_as(&Typed::I64(1), &prim(Kind::I64)).is_ok());
    assert!(serialize_as(&Typed::Str("1".into()), &prim(Kind::I64)).is_err());
    assert!(serialize_as(&Typed::Array(vec![Typed::I8(1)]), &Shape::fixed(prim(Kind::I8), 2)).is_err());
    assert!(!conforms(&Typed::Record(vec![]), &Address::shape()));
}

#[test]
fn large_unsigned_results_become_floats() {
    assert_eq!(serialize(&Typed::U64(5)), Value::Int(5));
    assert_eq!(serialize(&Typed::U64(u64::MAX)), Value::Float(u64::MAX as f64));
}

// ============================================================================
//  ENVELOPES
// ============================================================================

#[test]
fn call_uses_wire_field_names() {
    let call = Call::new("UserService", "Add", vec![Value::Int(1), Value::Int(2)]);
    let json = serde_json::to_string(&call).unwrap();
    assert_eq!(json, r#"{"ServiceName":"UserService","MethodName":"Add","InArgs":[1,2]}"#);
}

#[test]
fn null_args_decode_as_empty() {
    let call: Call =
        serde_json::from_str(r#"{"ServiceName":"S","MethodName":"M","InArgs":null}"#).unwrap();
    assert!(call.args.is_empty());

    let reply: Reply = serde_json::from_str(r#"{"OutArgs":null,"Error":""}"#).unwrap();
    assert!(reply.is_success());
    assert!(reply.results().is_empty());
}

#[test]
fn reply_error_text_marks_failure() {
    let reply = Reply::failure("method not found");
    let json = serde_json::to_string(&reply).unwrap();
    assert_eq!(json, r#"{"OutArgs":[],"Error":"method not found"}"#);

    let ok = serde_json::to_string(&Reply::success(vec![Value::Int(3)])).unwrap();
    assert_eq!(ok, r#"{"OutArgs":[3],"Error":""}"#);

    assert!(!Reply::failure("").is_success());
}

#[test]
fn unknown_envelope_fields_are_ignored() {
    let reply: Reply = serde_json::from_str(
        r#"{"ServiceName":"S","MethodName":"M","InArgs":[1],"OutArgs":[2],"Error":""}"#,
    )
    .unwrap();
    assert_eq!(reply.into_result(), Ok(vec![Value::Int(2)]));
}

// ============================================================================
//  STREAM CODEC
// ============================================================================

#[tokio::test]
async fn frames_cross_a_duplex_stream() {
    let (mut client, server) = tokio::io::duplex(64);
    let mut reader = FrameReader::new(server);

    let writer = tokio::spawn(async move {
        let call = Call::new("S", "M", vec![Value::from("x".repeat(200))]);
        encode_call(&mut client, &call).await.unwrap();
        encode_call(&mut client, &Call::new("S", "N", vec![])).await.unwrap();
    });

    let first = reader.decode_call().await.unwrap().unwrap();
    assert_eq!(first.method, "M");
    assert_eq!(first.args[0].as_str().map(str::len), Some(200));

    let second = reader.decode_call().await.unwrap().unwrap();
    assert_eq!(second.method, "N");

    writer.await.unwrap();
    assert_eq!(reader.decode_call().await, Ok(None));
}

#[tokio::test]
async fn one_read_can_hold_two_frames() {
    let bytes: &[u8] = b"{\"OutArgs\":[1],\"Error\":\"\"}  \n\t{\"OutArgs\":[],\"Error\":\"boom\"}";
    let mut reader = FrameReader::new(bytes);

    let first = reader.decode_reply().await.unwrap().unwrap();
    assert_eq!(first.results(), &[Value::Int(1)]);
    assert!(reader.buffered() > 0);

    let second = reader.decode_reply().await.unwrap().unwrap();
    assert_eq!(second.error(), Some("boom"));

    assert_eq!(reader.decode_reply().await, Ok(None));
}

#[tokio::test]
async fn eof_inside_a_record_is_truncation() {
    let bytes: &[u8] = b"{\"ServiceName\":\"S\",\"Meth";
    let mut reader = FrameReader::new(bytes);
    assert_eq!(
        reader.decode_call().await,
        Err(CodecError::Truncated { buffered: bytes.len() })
    );
}

#[tokio::test]
async fn whitespace_only_stream_is_clean_eof() {
    let mut reader = FrameReader::new(&b" \n\n "[..]);
    assert_eq!(reader.decode_call().await, Ok(None));
}

#[tokio::test]
async fn garbage_is_malformed() {
    let mut reader = FrameReader::new(&b"not json\n"[..]);
    assert!(matches!(reader.decode_call().await, Err(CodecError::Malformed(_))));

    let mut reader = FrameReader::new(&b"{\"InArgs\":5}\n"[..]);
    assert!(matches!(reader.decode_call().await, Err(CodecError::Malformed(_))));
}

#[tokio::test]
async fn oversized_records_are_refused() {
    let (mut client, server) = tokio::io::duplex(1024);
    let mut reader = FrameReader::with_limit(server, 32);

    client.write_all(b"{\"ServiceName\":\"").await.unwrap();
    client.write_all(&[b'a'; 64]).await.unwrap();

    assert_eq!(reader.decode_call().await, Err(CodecError::FrameTooLarge { limit: 32 }));
}

#[tokio::test]
async fn large_frame_in_small_writes_is_parsed_once() {
    let (mut client, server) = tokio::io::duplex(1500);
    let mut reader = FrameReader::new(server);

    let call = Call::new("S", "M", vec![Value::from("y".repeat(2 * 1024 * 1024))]);
    let mut bytes = serde_json::to_vec(&call).unwrap();
    bytes.push(b'\n');

    let writer = tokio::spawn(async move {
        for chunk in bytes.chunks(1400) {
            client.write_all(chunk).await.unwrap();
        }
    });

    let started = std::time::Instant::now();
    let decoded = reader.decode_call().await.unwrap().unwrap();
    let elapsed = started.elapsed();
    writer.await.unwrap();

    assert_eq!(decoded.args[0].as_str().map(str::len), Some(2 * 1024 * 1024));
    assert!(elapsed < std::time::Duration::from_secs(5), "decoding took {:?}", elapsed);
}

#[tokio::test]
async fn pretty_printed_records_still_decode() {
    let bytes: &[u8] = b"{\n  \"ServiceName\": \"S\",\n  \"MethodName\": \"M\",\n  \"InArgs\": [1]\n}\n";
    let mut reader = FrameReader::new(bytes);

    let call = reader.decode_call().await.unwrap().unwrap();
    assert_eq!((call.service.as_str(), call.method.as_str()), ("S", "M"));
    assert_eq!(reader.decode_call().await, Ok(None));
}

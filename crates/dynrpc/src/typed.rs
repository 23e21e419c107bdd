//! # Typed Values
//!
//! The output of coercion: a value that conforms to a `Shape`. Where a `Value` only
//! says what arrived on the wire, a `Typed` says what the handler will receive.

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;

use crate::shape::Kind;

/// Seconds from the Unix epoch back to January 1st of year 1, UTC.
const ZERO_TIME_SECS: i64 = -62_135_596_800;

/// A shape-conformant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Typed {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Time(DateTime<FixedOffset>),
    Optional(Option<Box<Typed>>),
    /// Fixed-length sequence.
    Array(Vec<Typed>),
    /// Homogeneous sequence of any length.
    List(Vec<Typed>),
    /// Record fields, in the order of the record shape.
    Record(Vec<(&'static str, Typed)>),
}

impl Typed {
    pub(crate) fn zero_of(kind: Kind) -> Typed {
        match kind {
            Kind::Bool => Typed::Bool(false),
            Kind::I8 => Typed::I8(0),
            Kind::I16 => Typed::I16(0),
            Kind::I32 => Typed::I32(0),
            Kind::I64 => Typed::I64(0),
            Kind::U8 => Typed::U8(0),
            Kind::U16 => Typed::U16(0),
            Kind::U32 => Typed::U32(0),
            Kind::U64 => Typed::U64(0),
            Kind::F32 => Typed::F32(0.0),
            Kind::F64 => Typed::F64(0.0),
            Kind::Str => Typed::Str(String::new()),
        }
    }

    /// Zero point of the temporal shape: `0001-01-01T00:00:00Z`, the zero
    /// timestamp peers written in Go send and expect.
    pub fn zero_time() -> DateTime<FixedOffset> {
        DateTime::<Utc>::from_timestamp(ZERO_TIME_SECS, 0).unwrap_or_default().into()
    }

    /// Helper to get a string description of the Typed variant for errors.
    pub fn desc(&self) -> &'static str {
        match self {
            Typed::Bool(_) => "bool",
            Typed::I8(_) => "i8",
            Typed::I16(_) => "i16",
            Typed::I32(_) => "i32",
            Typed::I64(_) => "i64",
            Typed::U8(_) => "u8",
            Typed::U16(_) => "u16",
            Typed::U32(_) => "u32",
            Typed::U64(_) => "u64",
            Typed::F32(_) => "f32",
            Typed::F64(_) => "f64",
            Typed::Str(_) => "string",
            Typed::Time(_) => "timestamp",
            Typed::Optional(_) => "optional",
            Typed::Array(_) => "array",
            Typed::List(_) => "list",
            Typed::Record(_) => "record",
        }
    }

    /// The primitive kind of a scalar, `None` for composites and timestamps.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Typed::Bool(_) => Some(Kind::Bool),
            Typed::I8(_) => Some(Kind::I8),
            Typed::I16(_) => Some(Kind::I16),
            Typed::I32(_) => Some(Kind::I32),
            Typed::I64(_) => Some(Kind::I64),
            Typed::U8(_) => Some(Kind::U8),
            Typed::U16(_) => Some(Kind::U16),
            Typed::U32(_) => Some(Kind::U32),
            Typed::U64(_) => Some(Kind::U64),
            Typed::F32(_) => Some(Kind::F32),
            Typed::F64(_) => Some(Kind::F64),
            Typed::Str(_) => Some(Kind::Str),
            _ => None,
        }
    }

    /// Looks up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Typed> {
        match self {
            Typed::Record(fields) => fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

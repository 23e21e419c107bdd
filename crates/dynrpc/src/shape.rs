//! # Shapes
//!
//! Static descriptions of what a parameter or result slot expects. Shapes are built
//! once when a handler is registered and then only read.
//!
//! Record field lists are produced on demand by a function pointer, so a record
//! that refers to itself through a sequence or an optional still has a finite shape.

use std::fmt;

use crate::typed::Typed;

/// Scalar kinds a primitive slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Str => "string",
        }
    }

    /// Returns `true` for kinds that take part in numeric conversion (everything but `Str`).
    pub fn is_numeric(self) -> bool {
        self != Kind::Str
    }
}

/// One named field of a record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
}

impl Field {
    pub fn new(name: &'static str, shape: Shape) -> Self {
        Self { name, shape }
    }
}

/// A named record whose fields are listed lazily.
#[derive(Clone, Copy)]
pub struct RecordShape {
    name: &'static str,
    fields: fn() -> Vec<Field>,
}

impl RecordShape {
    pub const fn new(name: &'static str, fields: fn() -> Vec<Field>) -> Self {
        Self { name, fields }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The record's fields, in declaration order.
    pub fn fields(&self) -> Vec<Field> {
        (self.fields)()
    }
}

impl fmt::Debug for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordShape").field(&self.name).finish()
    }
}

impl PartialEq for RecordShape {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Describes the type expected by a parameter or result slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Primitive(Kind),
    /// A nullable slot; the wire counterpart of a pointer or reference parameter.
    Optional(Box<Shape>),
    FixedSeq(Box<Shape>, usize),
    Seq(Box<Shape>),
    Record(RecordShape),
    /// A point in time, RFC 3339 on the wire.
    Temporal,
}

impl Shape {
    pub fn optional(inner: Shape) -> Self {
        Shape::Optional(Box::new(inner))
    }

    pub fn seq(inner: Shape) -> Self {
        Shape::Seq(Box::new(inner))
    }

    pub fn fixed(inner: Shape, len: usize) -> Self {
        Shape::FixedSeq(Box::new(inner), len)
    }

    pub fn record(name: &'static str, fields: fn() -> Vec<Field>) -> Self {
        Shape::Record(RecordShape::new(name, fields))
    }

    /// The value a slot of this shape holds when nothing was supplied for it.
    pub fn zero(&self) -> Typed {
        match self {
            Shape::Primitive(kind) => Typed::zero_of(*kind),
            Shape::Optional(_) => Typed::Optional(None),
            Shape::FixedSeq(inner, len) => Typed::Array((0..*len).map(|_| inner.zero()).collect()),
            Shape::Seq(_) => Typed::List(Vec::new()),
            Shape::Record(rec) => Typed::Record(
                rec.fields()
                    .into_iter()
                    .map(|field| (field.name, field.shape.zero()))
                    .collect(),
            ),
            Shape::Temporal => Typed::Time(Typed::zero_time()),
        }
    }

    /// Human readable description for diagnostics.
    ///
    /// Records are described by name only; expanding their fields could recurse forever.
    pub fn describe(&self) -> String {
        match self {
            Shape::Primitive(kind) => kind.name().to_string(),
            Shape::Optional(inner) => format!("optional<{}>", inner.describe()),
            Shape::FixedSeq(inner, len) => format!("[{}; {}]", inner.describe(), len),
            Shape::Seq(inner) => format!("seq<{}>", inner.describe()),
            Shape::Record(rec) => format!("record {}", rec.name()),
            Shape::Temporal => "timestamp".to_string(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

//! # Coercion
//!
//! The translation layer between wire `Value`s and shape-conformant `Typed` values.
//!
//! ## Invariants
//! - **Totality**: every (Value, Shape) pair either converts or yields a `CoercionError`.
//!   Nothing here panics on untrusted input.
//! - **Recursion Safety**: nesting is bounded by `MAX_RECURSION_DEPTH`.
//! - **Strict Records**: a map key that names no field of the record is a failure;
//!   a field absent from the map takes its shape's zero value.
//! - **Permissive Numbers**: bool, int and float sources convert to any numeric kind
//!   without range checks, the way a language-level numeric cast would.

use chrono::DateTime;
use chrono::SecondsFormat;
use dynpack::Map;
use dynpack::Value;

use crate::error::CoercionError;
use crate::shape::Kind;
use crate::shape::RecordShape;
use crate::shape::Shape;
use crate::typed::Typed;

/// The maximum nesting depth for values before giving up.
pub const MAX_RECURSION_DEPTH: usize = 64;

/// A specialized Result type for coercion.
pub type Result<T> = std::result::Result<T, CoercionError>;

/// How a `Shape::FixedSeq` treats a sequence of the wrong length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LengthPolicy {
    /// Coerce the first `len` elements, ignore extras, zero-fill missing slots.
    #[default]
    Lenient,
    /// Any length difference is a failure.
    Exact,
}

/// Tunables for the coercion engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub fixed_len: LengthPolicy,
}

impl Policy {
    /// Rejects fixed-length sequences whose length does not match exactly.
    pub fn strict() -> Self {
        Self { fixed_len: LengthPolicy::Exact }
    }
}

// ============================================================================
//  PATHS
// ============================================================================

#[derive(Clone, Copy)]
enum Segment<'a> {
    Root,
    Arg(usize),
    Field(&'a str),
    Index(usize),
}

/// Stack-allocated breadcrumb trail; only rendered when something fails.
struct Path<'a> {
    parent: Option<&'a Path<'a>>,
    segment: Segment<'a>,
    depth: usize,
}

impl Path<'static> {
    fn root() -> Self {
        Path { parent: None, segment: Segment::Root, depth: 0 }
    }

    fn arg(index: usize) -> Self {
        Path { parent: None, segment: Segment::Arg(index), depth: 0 }
    }
}

impl<'a> Path<'a> {
    fn field<'b>(&'b self, name: &'b str) -> Path<'b> {
        Path { parent: Some(self), segment: Segment::Field(name), depth: self.depth + 1 }
    }

    fn index(&self, index: usize) -> Path<'_> {
        Path { parent: Some(self), segment: Segment::Index(index), depth: self.depth + 1 }
    }

    fn render(&self) -> String {
        let mut segments = Vec::with_capacity(self.depth + 1);
        let mut cursor = Some(self);
        while let Some(path) = cursor {
            segments.push(path.segment);
            cursor = path.parent;
        }

        let mut out = String::new();
        for segment in segments.iter().rev() {
            match segment {
                Segment::Root => out.push('$'),
                Segment::Arg(i) => out.push_str(&format!("arg[{}]", i)),
                Segment::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                Segment::Index(i) => out.push_str(&format!("[{}]", i)),
            }
        }
        out
    }
}

fn mismatch(at: &Path, shape: &Shape, value: &Value) -> CoercionError {
    CoercionError::Mismatch {
        path: at.render(),
        expected: shape.describe(),
        found: value.kind_name().to_string(),
    }
}

// ============================================================================
//  VALUE -> TYPED
// ============================================================================

/// Coerces a single value into the given shape.
pub fn coerce(value: &Value, shape: &Shape, policy: &Policy) -> Result<Typed> {
    coerce_impl(value, shape, policy, &Path::root())
}

/// Coerces a positional argument list against parameter shapes.
///
/// Stops at the first failure; no partial list is ever returned.
pub fn coerce_args(args: &[Value], shapes: &[Shape], policy: &Policy) -> Result<Vec<Typed>> {
    if args.len() != shapes.len() {
        return Err(CoercionError::LengthMismatch {
            path: "args".into(),
            expected: shapes.len(),
            found: args.len(),
        });
    }

    args.iter()
        .zip(shapes)
        .enumerate()
        .map(|(i, (arg, shape))| coerce_impl(arg, shape, policy, &Path::arg(i)))
        .collect()
}

fn coerce_impl(value: &Value, shape: &Shape, policy: &Policy, at: &Path) -> Result<Typed> {
    if at.depth > MAX_RECURSION_DEPTH {
        return Err(CoercionError::TooDeep { path: at.render() });
    }

    match (value, shape) {
        (_, Shape::Primitive(kind)) => coerce_primitive(value, *kind, at),

        (Value::Str(text), Shape::Temporal) => DateTime::parse_from_rfc3339(text)
            .map(Typed::Time)
            .map_err(|e| CoercionError::BadTimestamp {
                path: at.render(),
                text: text.clone(),
                reason: e.to_string(),
            }),

        (Value::Null, Shape::Optional(_)) => Ok(Typed::Optional(None)),
        (_, Shape::Optional(inner)) => {
            let typed = coerce_impl(value, inner, policy, at)?;
            Ok(Typed::Optional(Some(Box::new(typed))))
        }

        (Value::Map(map), Shape::Record(rec)) => coerce_record(map, rec, policy, at),

        (Value::Seq(items), Shape::Seq(inner)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| coerce_impl(item, inner, policy, &at.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(Typed::List),

        (Value::Seq(items), Shape::FixedSeq(inner, len)) => {
            coerce_fixed(items, inner, *len, policy, at)
        }

        (value, shape) => Err(mismatch(at, shape, value)),
    }
}

/// Intermediate numeric form shared by every numeric target kind.
#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn is_nonzero(self) -> bool {
        match self {
            Number::Int(i) => i != 0,
            Number::Float(f) => f != 0.0,
        }
    }
}

/// Casts a `Number` into the `Typed` variant for one numeric kind.
macro_rules! cast_number {
    ($number:expr, $variant:ident, $ty:ty) => {
        match $number {
            Number::Int(i) => Typed::$variant(i as $ty),
            Number::Float(f) => Typed::$variant(f as $ty),
        }
    };
}

fn coerce_primitive(value: &Value, kind: Kind, at: &Path) -> Result<Typed> {
    let number = match (value, kind) {
        (Value::Str(s), Kind::Str) => return Ok(Typed::Str(s.clone())),
        (Value::Bool(b), k) if k.is_numeric() => Number::Int(*b as i64),
        (Value::Int(i), k) if k.is_numeric() => Number::Int(*i),
        (Value::Float(f), k) if k.is_numeric() => Number::Float(*f),
        _ => return Err(mismatch(at, &Shape::Primitive(kind), value)),
    };

    let typed = match kind {
        Kind::Bool => Typed::Bool(number.is_nonzero()),
        Kind::I8 => cast_number!(number, I8, i8),
        Kind::I16 => cast_number!(number, I16, i16),
        Kind::I32 => cast_number!(number, I32, i32),
        Kind::I64 => cast_number!(number, I64, i64),
        Kind::U8 => cast_number!(number, U8, u8),
        Kind::U16 => cast_number!(number, U16, u16),
        Kind::U32 => cast_number!(number, U32, u32),
        Kind::U64 => cast_number!(number, U64, u64),
        Kind::F32 => cast_number!(number, F32, f32),
        Kind::F64 => cast_number!(number, F64, f64),
        Kind::Str => return Err(mismatch(at, &Shape::Primitive(kind), value)),
    };
    Ok(typed)
}

fn coerce_record(map: &Map, rec: &RecordShape, policy: &Policy, at: &Path) -> Result<Typed> {
    let fields = rec.fields();

    if let Some(key) = map.keys().find(|k| !fields.iter().any(|f| f.name == k.as_str())) {
        return Err(CoercionError::UnknownField {
            path: at.render(),
            record: rec.name(),
            field: key.clone(),
        });
    }

    let mut out = Vec::with_capacity(fields.len());
    for field in &fields {
        let typed = match map.get(field.name) {
            Some(value) => coerce_impl(value, &field.shape, policy, &at.field(field.name))?,
            None => field.shape.zero(),
        };
        out.push((field.name, typed));
    }
    Ok(Typed::Record(out))
}

fn coerce_fixed(
    items: &[Value],
    inner: &Shape,
    len: usize,
    policy: &Policy,
    at: &Path,
) -> Result<Typed> {
    if policy.fixed_len == LengthPolicy::Exact && items.len() != len {
        return Err(CoercionError::LengthMismatch {
            path: at.render(),
            expected: len,
            found: items.len(),
        });
    }

    let mut out = Vec::with_capacity(len);
    for (i, item) in items.iter().take(len).enumerate() {
        out.push(coerce_impl(item, inner, policy, &at.index(i))?);
    }
    while out.len() < len {
        out.push(inner.zero());
    }
    Ok(Typed::Array(out))
}

// ============================================================================
//  TYPED -> VALUE
// ============================================================================

/// Serializes a typed value back to its wire form. Never fails.
pub fn serialize(typed: &Typed) -> Value {
    match typed {
        Typed::Bool(b) => Value::Bool(*b),
        Typed::I8(v) => Value::Int(*v as i64),
        Typed::I16(v) => Value::Int(*v as i64),
        Typed::I32(v) => Value::Int(*v as i64),
        Typed::I64(v) => Value::Int(*v),
        Typed::U8(v) => Value::Int(*v as i64),
        Typed::U16(v) => Value::Int(*v as i64),
        Typed::U32(v) => Value::Int(*v as i64),
        Typed::U64(v) => Value::from(*v),
        Typed::F32(v) => Value::Float(*v as f64),
        Typed::F64(v) => Value::Float(*v),
        Typed::Str(s) => Value::Str(s.clone()),
        Typed::Time(t) => Value::Str(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Typed::Optional(None) => Value::Null,
        Typed::Optional(Some(inner)) => serialize(inner),
        Typed::Array(items) | Typed::List(items) => Value::Seq(items.iter().map(serialize).collect()),
        Typed::Record(fields) => Value::Map(
            fields
                .iter()
                .map(|(name, v)| (name.to_string(), serialize(v)))
                .collect(),
        ),
    }
}

/// Serializes a typed value after checking it against its declared shape.
pub fn serialize_as(typed: &Typed, shape: &Shape) -> Result<Value> {
    check(typed, shape, &Path::root())?;
    Ok(serialize(typed))
}

/// Returns `true` if the typed value conforms to the shape.
pub fn conforms(typed: &Typed, shape: &Shape) -> bool {
    check(typed, shape, &Path::root()).is_ok()
}

fn check(typed: &Typed, shape: &Shape, at: &Path) -> Result<()> {
    if at.depth > MAX_RECURSION_DEPTH {
        return Err(CoercionError::TooDeep { path: at.render() });
    }

    match (typed, shape) {
        (t, Shape::Primitive(kind)) if t.kind() == Some(*kind) => Ok(()),
        (Typed::Time(_), Shape::Temporal) => Ok(()),
        (Typed::Optional(None), Shape::Optional(_)) => Ok(()),
        (Typed::Optional(Some(inner)), Shape::Optional(s)) => check(inner, s, at),
        (Typed::List(items), Shape::Seq(s)) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check(item, s, &at.index(i))),
        (Typed::Array(items), Shape::FixedSeq(s, len)) => {
            if items.len() != *len {
                return Err(CoercionError::LengthMismatch {
                    path: at.render(),
                    expected: *len,
                    found: items.len(),
                });
            }
            items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| check(item, s, &at.index(i)))
        }
        (Typed::Record(values), Shape::Record(rec)) => {
            for field in rec.fields() {
                let value = values
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| CoercionError::MissingField {
                        path: at.render(),
                        field: field.name.to_string(),
                    })?;
                check(value, &field.shape, &at.field(field.name))?;
            }
            Ok(())
        }
        (t, s) => Err(CoercionError::Mismatch {
            path: at.render(),
            expected: s.describe(),
            found: t.desc().to_string(),
        }),
    }
}

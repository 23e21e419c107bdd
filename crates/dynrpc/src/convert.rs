//! # Shaped Rust Types
//!
//! Bridges concrete Rust types and the dynamic `Shape`/`Typed` model. A type that
//! implements `Shaped` can describe its own shape, be rebuilt from a coerced value,
//! and turn itself back into one. Handler parameters and results are `Shaped`.
//!
//! Records are user structs wired up with the [`record!`](crate::record) macro.

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;

use crate::coerce::Result;
use crate::error::CoercionError;
use crate::shape::Field;
use crate::shape::Kind;
use crate::shape::Shape;
use crate::typed::Typed;

/// A Rust type with a static wire shape.
pub trait Shaped: Sized {
    /// The shape coercion must produce for this type.
    fn shape() -> Shape;

    /// Rebuilds the value from a typed value produced against `Self::shape()`.
    fn from_typed(typed: Typed) -> Result<Self>;

    /// Converts the value into its typed form.
    fn into_typed(self) -> Typed;
}

fn unexpected(expected: impl Into<String>, found: &Typed) -> CoercionError {
    CoercionError::Mismatch {
        path: "$".into(),
        expected: expected.into(),
        found: found.desc().to_string(),
    }
}

/// Implements `Shaped` for scalars that map one-to-one onto a `Kind`.
macro_rules! shaped_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Shaped for $ty {
                fn shape() -> Shape {
                    Shape::Primitive(Kind::$kind)
                }

                fn from_typed(typed: Typed) -> Result<Self> {
                    match typed {
                        Typed::$kind(v) => Ok(v),
                        other => Err(unexpected(Kind::$kind.name(), &other)),
                    }
                }

                fn into_typed(self) -> Typed {
                    Typed::$kind(self)
                }
            }
        )*
    };
}

shaped_scalar! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
}

impl Shaped for isize {
    fn shape() -> Shape {
        Shape::Primitive(Kind::I64)
    }

    fn from_typed(typed: Typed) -> Result<Self> {
        i64::from_typed(typed).map(|v| v as isize)
    }

    fn into_typed(self) -> Typed {
        Typed::I64(self as i64)
    }
}

impl Shaped for usize {
    fn shape() -> Shape {
        Shape::Primitive(Kind::U64)
    }

    fn from_typed(typed: Typed) -> Result<Self> {
        u64::from_typed(typed).map(|v| v as usize)
    }

    fn into_typed(self) -> Typed {
        Typed::U64(self as u64)
    }
}

impl Shaped for DateTime<FixedOffset> {
    fn shape() -> Shape {
        Shape::Temporal
    }

    fn from_typed(typed: Typed) -> Result<Self> {
        match typed {
            Typed::Time(t) => Ok(t),
            other => Err(unexpected("timestamp", &other)),
        }
    }

    fn into_typed(self) -> Typed {
        Typed::Time(self)
    }
}

impl Shaped for DateTime<Utc> {
    fn shape() -> Shape {
        Shape::Temporal
    }

    fn from_typed(typed: Typed) -> Result<Self> {
        DateTime::<FixedOffset>::from_typed(typed).map(|t| t.with_timezone(&Utc))
    }

    fn into_typed(self) -> Typed {
        Typed::Time(self.into())
    }
}

impl<T: Shaped> Shaped for Option<T> {
    fn shape() -> Shape {
        Shape::optional(T::shape())
    }

    fn from_typed(typed: Typed) -> Result<Self> {
        match typed {
            Typed::Optional(None) => Ok(None),
            Typed::Optional(Some(inner)) => T::from_typed(*inner).map(Some),
            other => Err(unexpected("optional", &other)),
        }
    }

    fn into_typed(self) -> Typed {
        Typed::Optional(self.map(|v| Box::new(v.into_typed())))
    }
}

/// A box is transparent on the wire; `Option<Box<T>>` is the usual pointer parameter.
impl<T: Shaped> Shaped for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn from_typed(typed: Typed) -> Result<Self> {
        T::from_typed(typed).map(Box::new)
    }

    fn into_typed(self) -> Typed {
        (*self).into_typed()
    }
}

impl<T: Shaped> Shaped for Vec<T> {
    fn shape() -> Shape {
        Shape::seq(T::shape())
    }

    fn from_typed(typed: Typed) -> Result<Self> {
        match typed {
            Typed::List(items) => items.into_iter().map(T::from_typed).collect(),
            other => Err(unexpected("list", &other)),
        }
    }

    fn into_typed(self) -> Typed {
        Typed::List(self.into_iter().map(Shaped::into_typed).collect())
    }
}

impl<T: Shaped, const N: usize> Shaped for [T; N] {
    fn shape() -> Shape {
        Shape::fixed(T::shape(), N)
    }

    fn from_typed(typed: Typed) -> Result<Self> {
        let items = match typed {
            Typed::Array(items) => items,
            other => return Err(unexpected(format!("array of {}", N), &other)),
        };

        let found = items.len();
        let values = items.into_iter().map(T::from_typed).collect::<Result<Vec<T>>>()?;
        values.try_into().map_err(|_| CoercionError::LengthMismatch {
            path: "$".into(),
            expected: N,
            found,
        })
    }

    fn into_typed(self) -> Typed {
        Typed::Array(self.into_iter().map(Shaped::into_typed).collect())
    }
}

// ============================================================================
//  RECORD SUPPORT
// ============================================================================

/// Shape of a struct field, inferred from a field accessor.
///
/// Used by `record!` so the macro never has to name field types.
pub fn field_shape<R, T, F>(_accessor: F) -> Shape
where
    T: Shaped,
    F: Fn(&R) -> &T,
{
    T::shape()
}

/// Opens a typed record for field extraction.
pub fn record_fields(typed: Typed, record: &'static str) -> Result<Vec<(&'static str, Typed)>> {
    match typed {
        Typed::Record(fields) => Ok(fields),
        other => Err(unexpected(format!("record {}", record), &other)),
    }
}

/// Removes a field from an opened record and rebuilds it as `T`.
pub fn take_field<T: Shaped>(fields: &mut Vec<(&'static str, Typed)>, name: &str) -> Result<T> {
    let idx = fields
        .iter()
        .position(|(n, _)| *n == name)
        .ok_or_else(|| CoercionError::MissingField {
            path: "$".into(),
            field: name.to_string(),
        })?;
    let (_, typed) = fields.swap_remove(idx);
    T::from_typed(typed)
}

/// Lists the fields of a record type, for building shapes by hand.
pub fn fields_of<T: Shaped>() -> Vec<Field> {
    match T::shape() {
        Shape::Record(rec) => rec.fields(),
        _ => Vec::new(),
    }
}

/// Implements `Shaped` for a plain struct, mapping each Rust field to its wire name.
///
/// Every field type must itself be `Shaped`. Map keys on the wire must match the
/// wire names exactly; keys not listed here are rejected during coercion.
///
/// ```ignore
/// struct Address { home: String, office: String }
///
/// dynrpc::record!(Address {
///     home => "HomeAddr",
///     office => "OfficeAddr",
/// });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ident { $($field:ident => $key:literal),* $(,)? }) => {
        impl $crate::Shaped for $ty {
            fn shape() -> $crate::Shape {
                fn fields() -> ::std::vec::Vec<$crate::Field> {
                    ::std::vec![
                        $( $crate::Field::new($key, $crate::convert::field_shape(|r: &$ty| &r.$field)), )*
                    ]
                }
                $crate::Shape::record(::std::stringify!($ty), fields)
            }

            fn from_typed(typed: $crate::Typed) -> ::std::result::Result<Self, $crate::CoercionError> {
                #[allow(unused_mut)]
                let mut fields = $crate::convert::record_fields(typed, ::std::stringify!($ty))?;
                ::std::result::Result::Ok($ty {
                    $( $field: $crate::convert::take_field(&mut fields, $key)?, )*
                })
            }

            fn into_typed(self) -> $crate::Typed {
                $crate::Typed::Record(::std::vec![
                    $( ($key, $crate::Shaped::into_typed(self.$field)), )*
                ])
            }
        }
    };
}

// ============================================================================
//  HANDLER RESULTS
// ============================================================================

/// What a handler may return: nothing, one `Shaped` value, or a tuple of them.
pub trait IntoResults {
    /// Declared result shapes, in order.
    fn shapes() -> Vec<Shape>;

    fn into_results(self) -> Vec<Typed>;
}

impl IntoResults for () {
    fn shapes() -> Vec<Shape> {
        Vec::new()
    }

    fn into_results(self) -> Vec<Typed> {
        Vec::new()
    }
}

impl<T: Shaped> IntoResults for T {
    fn shapes() -> Vec<Shape> {
        vec![T::shape()]
    }

    fn into_results(self) -> Vec<Typed> {
        vec![self.into_typed()]
    }
}

macro_rules! results_tuple {
    ($($name:ident),+) => {
        impl<$($name: Shaped),+> IntoResults for ($($name,)+) {
            fn shapes() -> Vec<Shape> {
                vec![$($name::shape()),+]
            }

            #[allow(non_snake_case)]
            fn into_results(self) -> Vec<Typed> {
                let ($($name,)+) = self;
                vec![$($name.into_typed()),+]
            }
        }
    };
}

results_tuple!(A, B);
results_tuple!(A, B, C);
results_tuple!(A, B, C, D);

//! # DynRPC
//!
//! Shape-directed reshaping of dynamic wire values, and the envelopes that carry them.
//!
//! ## Architecture
//!
//! A `Value` says what arrived; a `Shape` says what a handler expects. The coercion
//! engine walks both together and produces a `Typed` value or a `CoercionError`
//! naming the exact path that did not fit. `Shaped` connects `Typed` to ordinary
//! Rust types so handlers can be written as plain closures.
//!
//! Envelopes (`Call`, `Reply`) travel as newline-delimited JSON records through the
//! `codec` module.

pub mod codec;
pub mod coerce;
pub mod convert;
pub mod error;
pub mod frame;
pub mod shape;
pub mod typed;

#[cfg(test)]
mod tests;

pub use dynpack::Map;
pub use dynpack::Value;

pub use codec::DEFAULT_MAX_FRAME_BYTES;
pub use codec::FrameReader;
pub use codec::encode_call;
pub use codec::encode_reply;
pub use coerce::LengthPolicy;
pub use coerce::Policy;
pub use coerce::coerce;
pub use coerce::coerce_args;
pub use coerce::conforms;
pub use coerce::serialize;
pub use coerce::serialize_as;
pub use convert::IntoResults;
pub use convert::Shaped;
pub use error::CodecError;
pub use error::CoercionError;
pub use frame::Call;
pub use frame::Reply;
pub use shape::Field;
pub use shape::Kind;
pub use shape::RecordShape;
pub use shape::Shape;
pub use typed::Typed;

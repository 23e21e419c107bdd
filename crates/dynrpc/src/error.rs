//! # Error Definitions
//!
//! The two ledgers of failure below the dispatcher: values that do not fit a shape,
//! and byte streams that do not hold an envelope.

use std::fmt;

/// A value could not be reshaped into the requested `Shape`.
///
/// Every variant records the path (`$.Address.HomeAddr`, `arg[1][0]`) of the
/// offending value so a failure deep inside a record is still legible.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// The value's variant cannot convert to the expected shape.
    Mismatch { path: String, expected: String, found: String },
    /// A map key does not name any field of the target record.
    UnknownField { path: String, record: &'static str, field: String },
    /// A typed record was missing a field it must carry.
    MissingField { path: String, field: String },
    /// A string against a temporal shape was not RFC 3339.
    BadTimestamp { path: String, text: String, reason: String },
    /// A fixed-length sequence had the wrong number of elements (exact policy only).
    LengthMismatch { path: String, expected: usize, found: usize },
    /// Nesting exceeded the recursion limit.
    TooDeep { path: String },
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch { path, expected, found } => {
                write!(f, "{}: expected {}, found {}", path, expected, found)
            }
            Self::UnknownField { path, record, field } => {
                write!(f, "{}: record {} has no field '{}'", path, record, field)
            }
            Self::MissingField { path, field } => write!(f, "{}: missing field '{}'", path, field),
            Self::BadTimestamp { path, text, reason } => {
                write!(f, "{}: '{}' is not an RFC 3339 timestamp ({})", path, text, reason)
            }
            Self::LengthMismatch { path, expected, found } => {
                write!(f, "{}: expected {} elements, found {}", path, expected, found)
            }
            Self::TooDeep { path } => write!(f, "{}: nesting too deep", path),
        }
    }
}

impl std::error::Error for CoercionError {}

/// Failures reading or writing envelopes on a byte stream.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The underlying stream failed.
    Io(String),
    /// The bytes are not a valid envelope.
    Malformed(String),
    /// The stream ended in the middle of a record.
    Truncated { buffered: usize },
    /// An unfinished record grew past the configured limit.
    FrameTooLarge { limit: usize },
    /// The stream ended cleanly where an envelope was required.
    Closed,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
            Self::Malformed(msg) => write!(f, "Malformed envelope: {}", msg),
            Self::Truncated { buffered } => {
                write!(f, "Stream ended mid-record ({} bytes buffered)", buffered)
            }
            Self::FrameTooLarge { limit } => write!(f, "Envelope exceeds {} bytes", limit),
            Self::Closed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

//! # Protocol Frames
//!
//! The two envelopes of an exchange: a `Call` going out, a `Reply` coming back.
//!
//! ## Invariants
//! - **Exclusive Outcome**: a `Reply` holds an error or results, never both. The
//!   constructors are the only way to build one.
//! - **Forward Compatibility**: unknown envelope fields are skipped; a `null`
//!   argument list is an empty one.

use dynpack::Value;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// An invocation request: route by service and method, carry positional arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(rename = "ServiceName", default)]
    pub service: String,
    #[serde(rename = "MethodName", default)]
    pub method: String,
    #[serde(rename = "InArgs", default, deserialize_with = "nullable_seq")]
    pub args: Vec<Value>,
}

impl Call {
    pub fn new(service: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self { service: service.into(), method: method.into(), args }
    }
}

/// The answer to one `Call`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "OutArgs", default, deserialize_with = "nullable_seq")]
    results: Vec<Value>,
    #[serde(
        rename = "Error",
        default,
        serialize_with = "error_to_wire",
        deserialize_with = "error_from_wire"
    )]
    error: Option<String>,
}

impl Reply {
    pub fn success(results: Vec<Value>) -> Self {
        Self { results, error: None }
    }

    /// A failed reply. `""` reads as success on the wire, so an empty message is
    /// replaced with a generic one.
    pub fn failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message.push_str("unknown error");
        }
        Self { results: Vec::new(), error: Some(message) }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn results(&self) -> &[Value] {
        &self.results
    }

    /// Splits the reply into its results or its error message.
    ///
    /// Results that arrived next to an error are discarded.
    pub fn into_result(self) -> std::result::Result<Vec<Value>, String> {
        match self.error {
            Some(message) => Err(message),
            None => Ok(self.results),
        }
    }
}

fn nullable_seq<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn error_to_wire<S: Serializer>(error: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(error.as_deref().unwrap_or(""))
}

fn error_from_wire<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|m| !m.is_empty()))
}

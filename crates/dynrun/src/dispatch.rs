//! # Dispatcher
//!
//! Routes one `Call` to its handler and turns the outcome into a `Reply`.
//!
//! ## Invariants
//! - **No Partial Replies**: a reply carries every result or an error, never both.
//! - **Fail Fast**: argument coercion stops at the first argument that does not fit;
//!   the handler only runs once every argument has converted.
//! - **Contained Panics**: a handler that panics produces a failed reply; the
//!   connection carries on.

use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dynpack::Value;
use dynrpc::Call;
use dynrpc::CoercionError;
use dynrpc::Policy;
use dynrpc::Reply;
use dynrpc::coerce_args;
use dynrpc::serialize_as;
use tracing::debug;
use tracing::warn;

use crate::registry::Registry;

/// Why a call produced a failed reply. `Display` is the exact wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    ServiceNotFound,
    MethodNotFound,
    ArgumentCount { expected: usize, found: usize },
    ArgumentType(CoercionError),
    HandlerPanicked,
    ResultType(CoercionError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceNotFound => write!(f, "service not found"),
            Self::MethodNotFound => write!(f, "method not found"),
            Self::ArgumentCount { .. } => write!(f, "argument count mismatch"),
            Self::ArgumentType(_) => write!(f, "argument type mismatch"),
            Self::HandlerPanicked => write!(f, "handler panicked"),
            Self::ResultType(_) => write!(f, "result type mismatch"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ArgumentType(e) | Self::ResultType(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Resolves calls against a shared registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    policy: Policy,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, policy: Policy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handles one call. Never fails; failures become the reply's error text.
    pub fn dispatch(&self, call: &Call) -> Reply {
        match self.try_dispatch(call) {
            Ok(results) => Reply::success(results),
            Err(e) => {
                match &e {
                    DispatchError::ArgumentCount { expected, found } => warn!(
                        service = %call.service,
                        method = %call.method,
                        expected,
                        found,
                        "{}", e
                    ),
                    DispatchError::ArgumentType(detail) | DispatchError::ResultType(detail) => warn!(
                        service = %call.service,
                        method = %call.method,
                        detail = %detail,
                        "{}", e
                    ),
                    _ => warn!(service = %call.service, method = %call.method, "{}", e),
                }
                Reply::failure(e.to_string())
            }
        }
    }

    /// Handles one call, keeping the failure structured.
    pub fn try_dispatch(&self, call: &Call) -> Result<Vec<Value>> {
        debug!(service = %call.service, method = %call.method, args = call.args.len(), "dispatch");

        let service = self
            .registry
            .service(&call.service)
            .ok_or(DispatchError::ServiceNotFound)?;
        let handler = service
            .method(&call.method)
            .ok_or(DispatchError::MethodNotFound)?;

        if call.args.len() != handler.params.len() {
            return Err(DispatchError::ArgumentCount {
                expected: handler.params.len(),
                found: call.args.len(),
            });
        }

        let args = coerce_args(&call.args, &handler.params, &self.policy)
            .map_err(DispatchError::ArgumentType)?;

        let results = panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(args)))
            .map_err(|_| DispatchError::HandlerPanicked)?
            .map_err(DispatchError::ArgumentType)?;

        if results.len() != handler.results.len() {
            return Err(DispatchError::ResultType(CoercionError::LengthMismatch {
                path: "results".into(),
                expected: handler.results.len(),
                found: results.len(),
            }));
        }

        results
            .iter()
            .zip(&handler.results)
            .enumerate()
            .map(|(i, (typed, shape))| {
                let value = serialize_as(typed, shape)?;
                // NaN and infinities have no JSON form
                if !value.is_wire_safe() {
                    return Err(CoercionError::Mismatch {
                        path: format!("results[{}]", i),
                        expected: "finite number".into(),
                        found: "non-finite float".into(),
                    });
                }
                Ok(value)
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DispatchError::ResultType)
    }
}

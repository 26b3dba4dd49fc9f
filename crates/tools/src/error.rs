//! Errors local to function execution.
//!
//! These never propagate out of [`crate::registry::FunctionRegistry::execute`]
//! as a `Result::Err` — a failed function call is a recorded outcome, not a
//! failed turn. The enum exists so callers can match on *why* a call failed
//! when deciding what to log.

#[derive(thiserror::Error, Debug, Clone)]
pub enum FunctionError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("invalid arguments for {function}: {message}")]
    InvalidArguments { function: String, message: String },
}

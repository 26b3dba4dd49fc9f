//! The Function Registry & Executor: a closed, declared catalogue of
//! side-effectful actions the function-caller LLM may invoke against a
//! customer profile.

pub mod catalogue;
pub mod error;
pub mod registry;

pub use error::FunctionError;
pub use registry::{ExecutionOutcome, FunctionRegistry};

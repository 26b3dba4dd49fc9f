//! Shared error taxonomy used across all lumen crates.
//!
//! Each crate boundary (gateway, functions, prompt, sessions) defines its own
//! narrow error enum and converts into this top-level type at the Session
//! Manager's public surface. The variants mirror the error taxonomy: client
//! input errors are not retried, transient/parse LLM errors are handled
//! locally by the pipeline, persistence errors fail the whole turn, and
//! invariant violations are fatal to the owning session.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("evaluation stopped: {0}")]
    Stopped(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("upstream LLM: {0}")]
    UpstreamLlm(String),

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("config: {0}")]
    Config(String),

    #[error("template: {0}")]
    Template(String),

    /// An assertion the system relies on (history ordering, single-owner
    /// mutation) did not hold. Fatal to the owning evaluation.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

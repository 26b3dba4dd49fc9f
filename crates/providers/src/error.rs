//! Gateway-local failure taxonomy.
//!
//! [`LlmProvider`](crate::traits::LlmProvider) methods return this type
//! directly, not the shared domain `Error` — whether a failure is worth
//! retrying (`is_retryable`) is the orchestration layer's decision, and that
//! signal would be lost if the adapter collapsed it to a string here. Once a
//! caller's retry budget is exhausted, the `From` impl below converts the
//! final `GatewayError` into [`lumen_domain::Error::UpstreamLlm`].

/// A failure produced while talking to the upstream LLM.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    /// Network failure, timeout, or 5xx — safe to retry with backoff.
    #[error("transient upstream failure: {0}")]
    Transient(String),
    /// 429 / quota exhaustion. Retryable, but callers should back off further
    /// than a plain transient failure.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    /// The upstream returned 2xx but the body didn't match the expected
    /// response shape. Not retryable — the provider contract changed.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
    /// 401/403 — the configured credential was rejected.
    #[error("credential rejected: {0}")]
    AuthRejected(String),
}

impl GatewayError {
    /// Whether a retry with backoff is worth attempting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_) | GatewayError::QuotaExceeded(_))
    }
}

impl From<GatewayError> for lumen_domain::Error {
    fn from(e: GatewayError) -> Self {
        lumen_domain::Error::UpstreamLlm(e.to_string())
    }
}

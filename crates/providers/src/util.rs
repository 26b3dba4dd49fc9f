//! Shared helpers for the flash-class provider adapter.

use crate::error::GatewayError;

/// Convert a [`reqwest::Error`] into a [`GatewayError`].
///
/// Timeouts and connection failures are transient (retryable by the
/// orchestration layer); everything else that can't be attributed to an HTTP
/// status is treated the same way, since reqwest only reaches this path for
/// transport-level failures.
pub(crate) fn from_reqwest(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Transient(format!("timeout: {e}"))
    } else {
        GatewayError::Transient(e.to_string())
    }
}

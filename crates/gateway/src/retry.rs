//! Orchestration-layer retry policy for LLM Gateway calls.
//!
//! `LlmProvider` implementations never retry internally; whether a given
//! `GatewayError` is worth retrying is the caller's decision, made here with
//! exponential backoff and jitter. Each individual call still carries its
//! own `call_timeout_secs` at the HTTP client level (see
//! `FlashProvider::from_config`), so this wrapper only adds spacing between
//! attempts, not per-attempt timeouts.

use lumen_providers::GatewayError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, base_delay_ms: 200 }
    }

    /// Run `attempt` until it succeeds, exhausts the retry budget, or fails
    /// with a non-retryable error. Returns the last error on exhaustion.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut tries = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if tries < self.max_retries && err.is_retryable() => {
                    let delay = self.backoff_delay(tries);
                    tokio::time::sleep(delay).await;
                    tries += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(1u64 << attempt.min(10));
        let jitter = rand::thread_rng().gen_range(0..=self.base_delay_ms);
        Duration::from_millis(exp + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let policy = RetryPolicy::new(3);
        let calls = AtomicU32::new(0);
        let result = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, GatewayError>(42) }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let policy = RetryPolicy::new(3);
        let calls = AtomicU32::new(0);
        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(GatewayError::Transient("boom".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_invalid_response() {
        let policy = RetryPolicy::new(3);
        let calls = AtomicU32::new(0);
        let result: Result<u32, GatewayError> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::InvalidResponse("bad shape".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let policy = RetryPolicy::new(2);
        let calls = AtomicU32::new(0);
        let result: Result<u32, GatewayError> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Transient("still down".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

//! Retry policy for remote fetches.
//!
//! Both remote providers (rates and time) share the same policy: a bounded
//! number of attempts with exponential backoff between them. The policy is a
//! plain value object so callers and tests can tune it without touching the
//! fetch code.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Max attempts and backoff schedule for a retryable async operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    /// 3 attempts with 1s/2s/4s backoff usually succeeds without
    /// excessive delay.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `n` (0-based), doubling each time.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt)
    }

    /// A policy that never waits, for tests.
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds, the error is not retryable, or attempts are
/// exhausted. The scheduler yields during backoff; nothing busy-waits.
pub async fn retry_async<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(err);
                }
                let backoff = policy.backoff_for(attempt - 1);
                warn!(
                    op = label,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Retrying after failure"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_async(&RetryPolicy::immediate(3), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ConvertError::Network("flaky".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_async(&RetryPolicy::immediate(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ConvertError::Api("persistent".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_validation_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_async(&RetryPolicy::immediate(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ConvertError::Validation("bad".into())) }
        })
        .await;
        assert!(matches!(result, Err(ConvertError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
    }
}

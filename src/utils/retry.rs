use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff for fallible async operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(250),
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration, backoff: f64) -> Self {
        Self {
            attempts,
            delay,
            backoff,
        }
    }

    /// Runs `op` up to `attempts` times. Intermediate failures are logged
    /// and retried after a delay that grows by `backoff`; the last failure
    /// is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut wait = self.delay;

        for attempt in 0..attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 == attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Retrying {} (attempt {}/{}) after error: {}",
                        operation,
                        attempt + 2,
                        attempts,
                        e
                    );
                    tokio::time::sleep(wait).await;
                    wait = wait.mul_f64(self.backoff);
                }
            }
        }

        unreachable!("retry loop always returns on the last attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::BootstrapError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient_error() -> BootstrapError {
        BootstrapError::SecretError {
            backend: "test".to_string(),
            name: "secret".to_string(),
            message: "transient".to_string(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);

        let calls_clone = calls.clone();
        let result = policy
            .run("flaky_op", move || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient_error())
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2, Duration::from_millis(1), 2.0);

        let calls_clone = calls.clone();
        let result: Result<u32> = policy
            .run("always_fails", move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(transient_error())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(1), 2.0);
        let result = policy.run("one_shot", || async { Ok(7u32) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}

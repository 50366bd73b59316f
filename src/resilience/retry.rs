// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded retry with a cancellation token.
//!
//! Destroy commands against the host may fail transiently (the resource is
//! busy, the host is mid-navigation). They are retried a bounded number of
//! times; the delay between attempts is visible in [`RetryConfig`] rather
//! than hidden in a self-rescheduling timer.
//!
//! # Example
//!
//! ```
//! use lru_reaper::RetryConfig;
//! use std::time::Duration;
//!
//! // Destroy: two attempts, one second apart
//! let destroy = RetryConfig::destroy();
//! assert_eq!(destroy.max_attempts, 2);
//! assert_eq!(destroy.delay, Duration::from_secs(1));
//!
//! // Delay of your choosing
//! let fixed = RetryConfig::fixed(5, Duration::from_millis(200));
//! assert_eq!(fixed.delay, Duration::from_millis(200));
//! ```

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Retry policy. `max_attempts` counts the first try; every gap between
/// attempts is `delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub delay: Duration,
    pub max_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::destroy()
    }
}

impl RetryConfig {
    /// Fixed delay between a bounded number of attempts.
    #[must_use]
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Default policy for destroy commands: one retry after a second.
    #[must_use]
    pub fn destroy() -> Self {
        Self::fixed(2, Duration::from_secs(1))
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self::fixed(3, Duration::from_millis(1))
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Shutdown was requested before the operation succeeded.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: usize, last: Option<E> },

    /// Every attempt failed.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: usize, last: E },
}

impl<E> RetryError<E> {
    #[must_use]
    pub fn attempts(&self) -> usize {
        match self {
            Self::Cancelled { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Run `operation` until it succeeds, the attempts run out, or `cancel` fires.
///
/// Cancellation interrupts the delay between attempts; an attempt already in
/// flight is allowed to finish.
pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;
    let mut last = None;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled { attempts, last });
        }

        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(operation = operation_name, retries = attempts, "Operation succeeded after retrying");
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;

                if attempts >= max_attempts {
                    return Err(RetryError::Exhausted { attempts, last: err });
                }

                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max_attempts,
                    error = %err,
                    delay_ms = config.delay.as_millis() as u64,
                    "Operation failed, retrying"
                );
                last = Some(err);

                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(RetryError::Cancelled { attempts, last });
                    }
                    _ = sleep(config.delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let result: Result<i32, RetryError<TestError>> = retry(
            "test_op",
            &RetryConfig::test(),
            &CancellationToken::new(),
            || async { Ok(42) },
        ).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, RetryError<TestError>> = retry(
            "test_op",
            &RetryConfig::test(),
            &CancellationToken::new(),
            || {
                let a = attempts_clone.clone();
                async move {
                    let count = a.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err(TestError(format!("fail {}", count)))
                    } else {
                        Ok(42)
                    }
                }
            },
        ).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let config = RetryConfig::fixed(3, Duration::from_millis(1));

        let result: Result<i32, RetryError<TestError>> = retry(
            "test_op",
            &config,
            &CancellationToken::new(),
            || {
                let a = attempts_clone.clone();
                async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err(TestError("always fail".to_string()))
                }
            },
        ).await;

        match result.unwrap_err() {
            RetryError::Exhausted { attempts: n, last } => {
                assert_eq!(n, 3);
                assert!(last.0.contains("always fail"));
            }
            other => panic!("expected exhaustion, got {}", other),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let start = tokio::time::Instant::now();
        let config = RetryConfig::fixed(3, Duration::from_secs(1));

        let result: Result<(), RetryError<TestError>> = retry(
            "test_op",
            &config,
            &CancellationToken::new(),
            || async { Err(TestError("busy".into())) },
        ).await;

        assert_eq!(result.unwrap_err().attempts(), 3);
        // Two gaps of one second, no backoff growth
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_delay() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let config = RetryConfig::fixed(5, Duration::from_secs(60));
        let result: Result<(), RetryError<TestError>> = retry(
            "test_op",
            &config,
            &cancel,
            || async { Err(TestError("busy".into())) },
        ).await;

        match result.unwrap_err() {
            RetryError::Cancelled { attempts, last } => {
                assert_eq!(attempts, 1);
                assert!(last.is_some());
            }
            other => panic!("expected cancellation, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_operation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicUsize::new(0);

        let result: Result<(), RetryError<TestError>> = retry(
            "test_op",
            &RetryConfig::test(),
            &cancel,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        ).await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 0, last: None })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), RetryError<TestError>> = retry(
            "test_op",
            &RetryConfig::fixed(0, Duration::from_millis(1)),
            &CancellationToken::new(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError("nope".into())) }
            },
        ).await;

        assert_eq!(result.unwrap_err().attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Structured retry with exponential backoff.
//!
//! One combinator, reused by the balance guard and the uploader's post
//! step, parameterized by `(max_attempts, base_delay, per_attempt_timeout)`.
//! Backoff after attempt `n` is `2^n * base_delay`. A per-attempt timeout
//! counts as a retryable failure; a caller cannot abort an in-flight
//! sequence other than by letting it exhaust its attempt budget.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Retry parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// When set, each attempt is abandoned after this long and treated
    /// as a retryable failure.
    pub per_attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            per_attempt_timeout: None,
        }
    }

    pub const fn with_timeout(mut self, per_attempt_timeout: Duration) -> Self {
        self.per_attempt_timeout = Some(per_attempt_timeout);
        self
    }

    /// Delay before the attempt after `failed_attempt` (zero-based).
    pub fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        // Cap the shift so pathological attempt counts cannot overflow.
        self.base_delay.saturating_mul(1u32 << failed_attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Why a retried operation did not produce a value.
#[derive(Debug, Error)]
pub enum RetryFailure<E> {
    /// The last attempt failed and the budget is spent.
    #[error("failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    /// The error was classified non-retryable; no further attempts made.
    #[error("non-retryable failure on attempt {attempts}: {error}")]
    NotRetryable { attempts: u32, error: E },

    /// Every remaining attempt timed out, ending with the last one.
    #[error("timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },
}

impl<E> RetryFailure<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::NotRetryable { attempts, .. }
            | Self::TimedOut { attempts } => *attempts,
        }
    }

    /// The underlying error, when one exists (timeouts have none).
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::NotRetryable { error, .. } => Some(error),
            Self::TimedOut { .. } => None,
        }
    }
}

enum AttemptError<E> {
    Failed(E),
    TimedOut,
}

/// Run `operation` until it succeeds, the error is non-retryable, or the
/// attempt budget is exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: impl Fn(&E) -> bool,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;

    loop {
        let outcome = match policy.per_attempt_timeout {
            Some(limit) => match timeout(limit, operation()).await {
                Ok(result) => result.map_err(AttemptError::Failed),
                Err(_) => Err(AttemptError::TimedOut),
            },
            None => operation().await.map_err(AttemptError::Failed),
        };

        attempt += 1;

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let retryable = match &error {
            AttemptError::TimedOut => true,
            AttemptError::Failed(e) => is_retryable(e),
        };

        if !retryable {
            return Err(match error {
                AttemptError::Failed(e) => RetryFailure::NotRetryable {
                    attempts: attempt,
                    error: e,
                },
                AttemptError::TimedOut => unreachable!("timeouts are retryable"),
            });
        }

        if attempt >= policy.max_attempts {
            return Err(match error {
                AttemptError::Failed(e) => RetryFailure::Exhausted {
                    attempts: attempt,
                    last_error: e,
                },
                AttemptError::TimedOut => RetryFailure::TimedOut { attempts: attempt },
            });
        }

        let delay = policy.backoff_delay(attempt - 1);
        warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, backing off"
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let result = retry_with_backoff(
            &fast_policy(3),
            || async { Ok::<_, TestError>(42) },
            |_| true,
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = retry_with_backoff(
            &fast_policy(3),
            move || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok(7)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<i32, _> = retry_with_backoff(
            &fast_policy(5),
            move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Fatal)
                }
            },
            |e| *e == TestError::Transient,
        )
        .await;

        assert!(matches!(
            result,
            Err(RetryFailure::NotRetryable { attempts: 1, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion() {
        let result: Result<i32, _> = retry_with_backoff(
            &fast_policy(3),
            || async { Err(TestError::Transient) },
            |_| true,
        )
        .await;

        match result {
            Err(RetryFailure::Exhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, TestError::Transient);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_per_attempt_timeout_counts_as_retryable() {
        let policy = fast_policy(2).with_timeout(Duration::from_millis(5));

        let result: Result<i32, RetryFailure<TestError>> = retry_with_backoff(
            &policy,
            || async {
                sleep(Duration::from_millis(100)).await;
                Ok(1)
            },
            |_| true,
        )
        .await;

        assert!(matches!(result, Err(RetryFailure::TimedOut { attempts: 2 })));
    }

    #[tokio::test]
    async fn test_backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_failure_accessors() {
        let failure: RetryFailure<TestError> = RetryFailure::Exhausted {
            attempts: 3,
            last_error: TestError::Transient,
        };
        assert_eq!(failure.attempts(), 3);
        assert_eq!(failure.into_inner(), Some(TestError::Transient));

        let timed_out: RetryFailure<TestError> = RetryFailure::TimedOut { attempts: 2 };
        assert!(timed_out.into_inner().is_none());
    }
}

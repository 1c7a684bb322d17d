//! Retry policies and the shared `with_retry` combinator.
//!
//! Page navigation, per-asset downloads and per-chapter batch retries all run
//! through [`with_retry`]; only the [`RetryPolicy`] data differs between them.
//!
//! # Delay Calculation
//!
//! The [`Backoff`] strategy yields the base delay after a failed attempt; the
//! policy then adds up to `jitter` of random delay on top.
//!
//! ```text
//! Fixed(d)                      -> d, d, d, ...
//! Linear { base, step }         -> base, base + step, base + 2*step, ...
//! Exponential { base, mult, max } -> min(base * mult^(n-1), max)
//! ```
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use mangadl_core::retry::{RetryPolicy, with_retry};
//!
//! # async fn example() {
//! let policy = RetryPolicy::fixed(3, Duration::from_millis(10));
//! let result: Result<u32, _> = with_retry(&policy, "example", |attempt| async move {
//!     if attempt < 2 { Err("not yet") } else { Ok(attempt) }
//! })
//! .await;
//! assert_eq!(result.unwrap(), 2);
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

/// Default maximum attempts (including the first one).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts (2 seconds).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// How long to wait after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay after every failure.
    Fixed(Duration),
    /// Delay grows by `step` after every failure.
    Linear {
        /// Delay after the first failure.
        base: Duration,
        /// Added per subsequent failure.
        step: Duration,
    },
    /// Delay multiplies after every failure, capped at `max`.
    Exponential {
        /// Delay after the first failure.
        base: Duration,
        /// Growth factor per failure.
        multiplier: f32,
        /// Upper bound.
        max: Duration,
    },
}

impl Backoff {
    /// Base delay after attempt `attempt` (1-indexed) failed, without jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let n = attempt.max(1) - 1;
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => delay,
            Self::Linear { base, step } => base + step.saturating_mul(n),
            Self::Exponential {
                base,
                multiplier,
                max,
            } => {
                let exponent = i32::try_from(n).unwrap_or(i32::MAX);
                let delay_ms = base.as_millis() as f64 * f64::from(multiplier).powi(exponent);
                let capped_ms = delay_ms.min(max.as_millis() as f64);
                Duration::from_millis(capped_ms as u64)
            }
        }
    }
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number comes next (1-indexed).
        attempt: u32,
    },

    /// Stop retrying.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Retry configuration: attempt ceiling plus backoff strategy.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `backoff`: fixed 2 seconds
/// - `jitter`: none
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            jitter: Duration::ZERO,
        }
    }

    /// Policy with a fixed delay between attempts.
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, Backoff::Fixed(delay))
    }

    /// Policy that runs the operation exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Backoff::None)
    }

    /// Adds up to `jitter` of random delay to every backoff.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Maximum attempts including the first one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The configured backoff strategy.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Decides whether to retry after attempt `attempt` (1-indexed) failed.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }
        RetryDecision::Retry {
            delay: self.backoff.delay_for(attempt) + self.calculate_jitter(),
            attempt: attempt + 1,
        }
    }

    fn calculate_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Returned when an operation failed on its final attempt.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted<E: Display> {
    /// Number of attempts made.
    pub attempts: u32,
    /// Error from the final attempt.
    pub last_error: E,
}

/// Runs `operation` until it succeeds or `policy` gives up.
///
/// The closure receives the 1-indexed attempt number.
///
/// # Errors
///
/// Returns [`RetryExhausted`] with the last error once attempts run out.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    operation: F,
) -> Result<T, RetryExhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(policy, label, operation, |_| true).await
}

/// Like [`with_retry`], but stops early when `is_retryable` rejects an error.
///
/// # Errors
///
/// Returns [`RetryExhausted`] with the last error once attempts run out or a
/// non-retryable error is seen.
pub async fn with_retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
    is_retryable: P,
) -> Result<T, RetryExhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !is_retryable(&error) {
            debug!(label, attempt, error = %error, "error is not retryable");
            return Err(RetryExhausted {
                attempts: attempt,
                last_error: error,
            });
        }

        match policy.should_retry(attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next_attempt,
            } => {
                warn!(
                    label,
                    attempt = next_attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "retrying"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(label, attempt, reason = %reason, "giving up");
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff(), Backoff::Fixed(Duration::from_secs(2)));
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::new(0, Backoff::None);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_backoff_linear_grows_by_step() {
        let backoff = Backoff::Linear {
            base: Duration::from_secs(1),
            step: Duration::from_millis(500),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(1500));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_exponential_respects_max() {
        let backoff = Backoff::Exponential {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(5),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(6), Duration::from_secs(5));
    }

    #[test]
    fn test_should_retry_respects_max_attempts() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(2));
        assert!(matches!(
            policy.should_retry(1),
            RetryDecision::Retry { attempt: 2, .. }
        ));
        assert!(matches!(
            policy.should_retry(2),
            RetryDecision::Retry { attempt: 3, .. }
        ));
        let decision = policy.should_retry(3);
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("exhausted"));
        } else {
            panic!("Expected DoNotRetry");
        }
    }

    #[test]
    fn test_jitter_within_bounds() {
        let policy =
            RetryPolicy::fixed(5, Duration::from_secs(1)).with_jitter(Duration::from_millis(200));
        for _ in 0..100 {
            if let RetryDecision::Retry { delay, .. } = policy.should_retry(1) {
                assert!(delay >= Duration::from_secs(1));
                assert!(delay <= Duration::from_millis(1200));
            } else {
                panic!("Expected Retry");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_succeeds_on_last_attempt_after_two_delays() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(2));
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = with_retry(&policy, "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("fail {attempt}"))
                } else {
                    Ok("loaded")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "loaded");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_exhausts_after_max_attempts() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(2));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&policy, "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("fail {attempt}")) }
        })
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "fail 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_if_stops_on_permanent_error() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = with_retry_if(
            &policy,
            "test",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("404") }
            },
            |error: &&str| *error != "404",
        )
        .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_retry_exhausted_display() {
        let err = RetryExhausted {
            attempts: 3,
            last_error: "boom",
        };
        assert_eq!(err.to_string(), "gave up after 3 attempt(s): boom");
    }
}

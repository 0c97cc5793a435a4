//! Retry policy and the sleep abstraction used between attempts.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::RequestError;

/// Default number of attempts per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// How many times to try, how long to wait, and which failures qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further one.
    pub base_delay: Duration,
    /// Whether a rejected request (non-429 4xx) is retried like a transient
    /// failure. On by default.
    pub retry_rejected: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            retry_rejected: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_retry_rejected(mut self, retry_rejected: bool) -> Self {
        self.retry_rejected = retry_rejected;
        self
    }

    /// Effective attempt budget.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after the failed attempt with zero-based index `attempt`:
    /// `base_delay * 2^attempt`, saturating.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX)
    }

    pub fn is_retryable(&self, error: &RequestError) -> bool {
        error.is_transient() || self.retry_rejected
    }

    /// Decide what happens after attempt `attempt` failed with `error`.
    ///
    /// `Some(delay)` means sleep then try again; `None` means give up and
    /// surface the error.
    pub fn next_delay(&self, attempt: u32, error: &RequestError) -> Option<Duration> {
        let is_last = attempt.saturating_add(1) >= self.attempts();
        if is_last || !self.is_retryable(error) {
            return None;
        }
        Some(self.delay_for_attempt(attempt))
    }

    /// Total time spent sleeping if every attempt fails.
    pub fn max_total_delay(&self) -> Duration {
        (0..self.attempts() - 1)
            .map(|attempt| self.delay_for_attempt(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Suspension between attempts. Abstracted so tests don't actually wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately.
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unavailable(attempt: u32) -> RequestError {
        RequestError::ServiceUnavailable {
            status: 500,
            attempt,
        }
    }

    fn rejected(attempt: u32) -> RequestError {
        RequestError::ServiceRejected {
            status: 400,
            attempt,
            message: "Invalid argument".to_string(),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
        assert!(policy.retry_rejected);
    }

    #[test]
    fn test_delays_double() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let delays: Vec<_> = (0..4).map(|i| policy.delay_for_attempt(i)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(64), Duration::from_secs(u32::MAX as u64));
        let policy = RetryPolicy::new(100, Duration::MAX);
        assert_eq!(policy.delay_for_attempt(3), Duration::MAX);
    }

    #[test]
    fn test_no_delay_after_last_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        assert_eq!(
            policy.next_delay(0, &unavailable(0)),
            Some(Duration::from_millis(10))
        );
        assert_eq!(
            policy.next_delay(1, &unavailable(1)),
            Some(Duration::from_millis(20))
        );
        assert_eq!(policy.next_delay(2, &unavailable(2)), None);
    }

    #[test]
    fn test_rejected_retried_by_default() {
        let policy = RetryPolicy::default();
        assert!(policy.next_delay(0, &rejected(0)).is_some());
    }

    #[test]
    fn test_rejected_not_retried_when_disabled() {
        let policy = RetryPolicy::default().with_retry_rejected(false);
        assert_eq!(policy.next_delay(0, &rejected(0)), None);
        assert!(policy.next_delay(0, &unavailable(0)).is_some());
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.next_delay(0, &unavailable(0)), None);
        assert_eq!(policy.max_total_delay(), Duration::ZERO);
    }

    #[test]
    fn test_max_total_delay() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1000));
        // 1 + 2 + 4 + 8 seconds; no sleep after the fifth attempt
        assert_eq!(policy.max_total_delay(), Duration::from_millis(15_000));
    }

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        let observer = sleeper.clone();
        sleeper.sleep(Duration::from_millis(5)).await;
        sleeper.sleep(Duration::from_millis(10)).await;
        assert_eq!(
            observer.delays(),
            vec![Duration::from_millis(5), Duration::from_millis(10)]
        );
    }
}

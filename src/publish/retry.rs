// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded exponential backoff for chart uploads.

use std::future::Future;
use std::time::Duration;

use crate::error::PublishError;

/// Retry budget and backoff schedule for an upload.
///
/// Attempts are numbered from 1. The wait after failed attempt `k` is
/// `initial_delay * backoff_multiplier^k`, capped at `max_delay`. With the
/// defaults that is 2, 4, 8 and 16 minutes between five attempts.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use thermostat_monitor::publish::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(120));
/// assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(960));
///
/// let quick = RetryPolicy::new()
///     .with_max_attempts(3)
///     .with_initial_delay(Duration::from_millis(10));
/// assert!(!quick.should_retry(3));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay the multiplier is applied to.
    pub initial_delay: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f32,
}

impl RetryPolicy {
    /// Creates a policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows a single attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the total number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum single wait.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Returns the wait after failed attempt `attempt`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }

    /// Returns true if another attempt may follow attempt `attempt`.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Runs `operation` until it succeeds, fails permanently, or the budget
    /// is spent.
    ///
    /// `operation` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable error as-is, or
    /// `PublishError::RetriesExhausted` wrapping the last error.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, PublishError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, PublishError>>,
    {
        let mut attempt = 1;
        loop {
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if !self.should_retry(attempt) {
                return Err(PublishError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.delay_for_attempt(attempt);
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                ?delay,
                error = %error,
                "Upload attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(30 * 60),
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), 2 * MINUTE);
        assert_eq!(policy.delay_for_attempt(2), 4 * MINUTE);
        assert_eq!(policy.delay_for_attempt(3), 8 * MINUTE);
        assert_eq!(policy.delay_for_attempt(4), 16 * MINUTE);
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::default().with_max_delay(5 * MINUTE);
        assert_eq!(policy.delay_for_attempt(4), 5 * MINUTE);
    }

    #[test]
    fn attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(4));
        assert!(!policy.should_retry(5));
        assert!(!RetryPolicy::no_retry().should_retry(1));
        assert_eq!(RetryPolicy::new().with_max_attempts(0).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn five_failures_wait_2_4_8_16_minutes_then_give_up() {
        let calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let policy = RetryPolicy::default();

        let result: Result<(), _> = policy
            .run(|_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.lock().push(Instant::now());
                    Err(PublishError::Status { status: 503 })
                }
            })
            .await;

        match result {
            Err(PublishError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert!(matches!(*last, PublishError::Status { status: 503 }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }

        let calls = calls.lock();
        assert_eq!(calls.len(), 5);
        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        let expected = [2 * MINUTE, 4 * MINUTE, 8 * MINUTE, 16 * MINUTE];
        for (gap, want) in gaps.iter().zip(expected) {
            assert!(
                *gap >= want && *gap < want + Duration::from_secs(1),
                "gap {gap:?}, expected {want:?}"
            );
        }
        assert!(calls[4] - calls[0] >= 30 * MINUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_failures_stops_retrying() {
        let attempts_seen = Arc::new(Mutex::new(Vec::new()));
        let policy = RetryPolicy::default();

        let result = policy
            .run(|attempt| {
                let attempts_seen = Arc::clone(&attempts_seen);
                async move {
                    attempts_seen.lock().push(attempt);
                    if attempt < 3 {
                        Err(PublishError::Rejected("busy".to_string()))
                    } else {
                        Ok("https://plot.ly/~user/1")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "https://plot.ly/~user/1");
        assert_eq!(*attempts_seen.lock(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let count = Arc::new(Mutex::new(0u32));
        let policy = RetryPolicy::default();
        let start = Instant::now();

        let result: Result<(), _> = policy
            .run(|_| {
                let count = Arc::clone(&count);
                async move {
                    *count.lock() += 1;
                    Err(PublishError::MissingCredentials)
                }
            })
            .await;

        assert!(matches!(result, Err(PublishError::MissingCredentials)));
        assert_eq!(*count.lock(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}

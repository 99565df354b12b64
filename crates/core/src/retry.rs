//! Retry policy for failed work items
//!
//! The default is [`RetryPolicy::no_retry`]: a failed item is recorded as failed
//! and never re-sent. Retrying costs API quota, so it has to be switched on
//! explicitly.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::duration::millis;
use crate::error::{ConfigError, ItemError};

/// How often and how patiently a failed item is re-sent.
///
/// Only errors for which [`ItemError::is_retryable`] holds are retried. The
/// pause before a retry holds the item's gate slot, so it is kept short: it
/// grows from `initial_interval`, stops at `max_interval`, and never exceeds
/// the item timeout the dispatcher passes in.
///
/// # Example
///
/// ```
/// use refminer_core::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential()
///     .with_max_attempts(4)
///     .with_backoff(Duration::from_secs(1), Duration::from_secs(30))
///     .with_jitter(0.0);
///
/// assert_eq!(policy.backoff(3, None), Duration::from_secs(4));
/// assert_eq!(policy.backoff(3, Some(Duration::from_secs(3))), Duration::from_secs(3));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,

    /// Pause before the first retry
    #[serde(with = "millis")]
    pub initial_interval: Duration,

    /// Longest pause before any retry
    #[serde(with = "millis")]
    pub max_interval: Duration,

    /// Growth factor between consecutive pauses (>= 1.0)
    pub backoff_coefficient: f64,

    /// Largest fraction (0.0-1.0) shaved off a pause at random
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryPolicy {
    /// Single attempt, failures are final
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            backoff_coefficient: 1.0,
            jitter: 0.0,
        }
    }

    /// 3 attempts, pauses of 2s doubling up to 30s, up to 20% shaved off
    pub fn exponential() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            backoff_coefficient: 2.0,
            jitter: 0.2,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// First and longest pause; equal values give a constant pause
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_interval = initial;
        self.max_interval = max.max(initial);
        self
    }

    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether this policy ever retries
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 1
    }

    /// Reject values that would make pauses meaningless or negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if !self.backoff_coefficient.is_finite() || self.backoff_coefficient < 1.0 {
            return Err(ConfigError::invalid(format!(
                "retry backoff_coefficient must be a finite number >= 1.0, got {}",
                self.backoff_coefficient
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::invalid(format!(
                "retry jitter must be between 0.0 and 1.0, got {}",
                self.jitter
            )));
        }
        Ok(())
    }

    /// Pause before retry number `retry` (1 = the first retry).
    ///
    /// `ceiling` caps the pause on top of `max_interval`; the dispatcher
    /// passes the item timeout. Out-of-range coefficients and jitter are
    /// treated as 1.0 and 0.0, so this never panics on an unvalidated policy.
    pub fn backoff(&self, retry: u32, ceiling: Option<Duration>) -> Duration {
        if retry == 0 || self.initial_interval.is_zero() {
            return Duration::ZERO;
        }

        let cap = match ceiling {
            Some(limit) => self.max_interval.min(limit),
            None => self.max_interval,
        };

        let coefficient = if self.backoff_coefficient.is_finite() {
            self.backoff_coefficient.max(1.0)
        } else {
            1.0
        };
        let steps = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * coefficient.powi(steps);

        // powi overflows to infinity long before the cap matters
        let pause = if secs.is_finite() && secs < cap.as_secs_f64() {
            Duration::from_secs_f64(secs.max(0.0))
        } else {
            cap
        };

        let jitter = if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if jitter == 0.0 || pause.is_zero() {
            return pause;
        }
        let shave = rand::thread_rng().gen_range(0.0..=jitter);
        pause.mul_f64(1.0 - shave)
    }

    /// Whether the item should be sent again after `error` on `attempt` (1-based)
    pub fn should_retry(&self, error: &ItemError, attempt: u32) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }
}

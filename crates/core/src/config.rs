// Run configuration for the batch dispatcher
//
// RunConfig is a plain value: build it directly, through the with_* setters,
// or deserialize it (durations are milliseconds). Dispatcher construction calls
// validate(), so a zero gate or batch size fails before any work starts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::{millis, option_millis};
use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Scheduling parameters for one dispatcher run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Maximum handler invocations in flight at once
    pub max_concurrent: usize,

    /// Items per batch; the next batch waits for the whole previous one
    pub batch_size: usize,

    /// Pause taken after acquiring a gate slot, before calling the handler
    #[serde(with = "millis", default = "default_inter_item_delay")]
    pub inter_item_delay: Duration,

    /// Cooldown between consecutive batches
    #[serde(with = "millis", default = "default_inter_batch_delay")]
    pub inter_batch_delay: Duration,

    /// Budget for a single handler attempt (None = unbounded)
    #[serde(with = "option_millis", default = "default_item_timeout")]
    pub item_timeout: Option<Duration>,

    /// Retry behaviour for retryable failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_inter_item_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_inter_batch_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_item_timeout() -> Option<Duration> {
    Some(Duration::from_secs(300))
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            batch_size: 50,
            inter_item_delay: default_inter_item_delay(),
            inter_batch_delay: default_inter_batch_delay(),
            item_timeout: default_item_timeout(),
            retry: RetryPolicy::no_retry(),
        }
    }
}

impl RunConfig {
    /// Create a configuration with the given gate and batch sizes
    pub fn new(max_concurrent: usize, batch_size: usize) -> Self {
        Self {
            max_concurrent,
            batch_size,
            ..Default::default()
        }
    }

    /// No pacing at all; mostly useful in tests
    pub fn unpaced(max_concurrent: usize, batch_size: usize) -> Self {
        Self {
            max_concurrent,
            batch_size,
            inter_item_delay: Duration::ZERO,
            inter_batch_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    pub fn without_item_timeout(mut self) -> Self {
        self.item_timeout = None;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check the invariants the dispatcher relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if let Some(timeout) = self.item_timeout {
            if timeout.is_zero() {
                return Err(ConfigError::invalid("item_timeout must be non-zero"));
            }
        }
        self.retry.validate()
    }

    /// Number of batches needed for `items` items
    pub fn batch_count(&self, items: usize) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        items.div_ceil(self.batch_size)
    }
}

// Error types for batch dispatch

use std::time::Duration;
use thiserror::Error;

/// Invalid run configuration. Always detected before any work starts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The concurrency gate would never admit anything
    #[error("max_concurrent must be greater than zero")]
    ZeroConcurrency,

    /// Items could never be partitioned
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    /// Retry policy with no attempts at all
    #[error("retry policy must allow at least one attempt")]
    ZeroAttempts,

    /// Anything else a collaborator considers invalid
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a generic invalid-configuration error
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

/// Failure of a single work item.
///
/// Handlers return this instead of panicking; the dispatcher records it as a
/// [`crate::Outcome::Failure`] and moves on to the other items.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemError {
    /// Connection refused, reset, DNS failure, broken stream
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote endpoint answered with a non-success status
    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Request, idle gap or whole-item budget exceeded
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Remote endpoint reported an error inside an otherwise successful response
    #[error("remote error: {0}")]
    Remote(String),

    /// Local input problem (unreadable file, bad payload)
    #[error("input error: {0}")]
    Input(String),

    /// Handler panicked
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Item never ran to completion
    #[error("cancelled")]
    Cancelled,
}

impl ItemError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        ItemError::Transport(msg.into())
    }

    /// Create a status error
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ItemError::Status {
            status,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        ItemError::Decode(msg.into())
    }

    /// Create a remote error
    pub fn remote(msg: impl Into<String>) -> Self {
        ItemError::Remote(msg.into())
    }

    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        ItemError::Input(msg.into())
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, timeouts, 429 and 5xx are transient; everything
    /// else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ItemError::Transport(_) | ItemError::Timeout(_) => true,
            ItemError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

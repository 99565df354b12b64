// Work items, outcomes and the run report
//
// A WorkItem carries its original zero-based index. The index travels with the
// item through scheduling and comes back on the Outcome, so callers can always
// line results up with inputs.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of input paired with its original position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem<T> {
    /// Zero-based position in the input sequence
    pub index: usize,
    /// Opaque payload (reference text, file path, remote file id, ...)
    pub payload: T,
}

impl<T> WorkItem<T> {
    /// Create a work item
    pub fn new(index: usize, payload: T) -> Self {
        Self { index, payload }
    }

    /// Number payloads in order, starting at zero
    pub fn from_payloads(payloads: impl IntoIterator<Item = T>) -> Vec<Self> {
        payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| Self::new(index, payload))
            .collect()
    }
}

/// Terminal result of one work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// Handler produced a payload
    Success { index: usize, payload: T },
    /// Handler failed, panicked, timed out or was cancelled
    Failure { index: usize, error: String },
}

impl<T> Outcome<T> {
    /// Create a success outcome
    pub fn success(index: usize, payload: T) -> Self {
        Outcome::Success { index, payload }
    }

    /// Create a failure outcome from anything displayable
    pub fn failure(index: usize, error: impl ToString) -> Self {
        Outcome::Failure {
            index,
            error: error.to_string(),
        }
    }

    /// Original index of the item this outcome belongs to
    pub fn index(&self) -> usize {
        match self {
            Outcome::Success { index, .. } | Outcome::Failure { index, .. } => *index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    /// Success payload, if any
    pub fn payload(&self) -> Option<&T> {
        match self {
            Outcome::Success { payload, .. } => Some(payload),
            Outcome::Failure { .. } => None,
        }
    }

    /// Failure description, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { error, .. } => Some(error),
        }
    }

    /// Transform the success payload, keeping index and failures as-is
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success { index, payload } => Outcome::Success {
                index,
                payload: f(payload),
            },
            Outcome::Failure { index, error } => Outcome::Failure { index, error },
        }
    }
}

/// Ordered outcomes of one dispatcher run
#[derive(Debug, Clone)]
pub struct RunReport<T> {
    /// Identifier used in log lines for this run
    pub run_id: Uuid,
    /// One outcome per input item, in input order
    pub outcomes: Vec<Outcome<T>>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl<T> RunReport<T> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Counts and timing, without the payloads
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            total: self.len(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            elapsed_ms: self.elapsed.as_millis() as u64,
        }
    }

    pub fn into_outcomes(self) -> Vec<Outcome<T>> {
        self.outcomes
    }
}

/// Serializable totals for a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

// Batch Dispatch Core
//
// This crate runs an asynchronous handler over an ordered list of work items
// against a rate-limited remote API.
//
// Key design decisions:
// - A semaphore gate bounds concurrent handler invocations (max_concurrent)
// - Items run in contiguous batches; a batch fully settles before the next starts
// - Fixed pacing: a pause before each handler call and a cooldown between batches
// - Failures are data: handlers return Result<T, ItemError>, panics and timeouts
//   are caught, and every item yields exactly one Outcome at its original index
// - Retries are opt-in through RetryPolicy (default: none)
// - No HTTP or file I/O here; clients and sinks live in sibling crates

pub mod config;
pub mod dispatcher;
mod duration;
pub mod error;
pub mod item;
pub mod retry;
pub mod telemetry;

// Re-exports for convenience
pub use config::RunConfig;
pub use dispatcher::{BatchDispatcher, FnHandler, ItemHandler};
pub use error::{ConfigError, ItemError};
pub use item::{Outcome, RunReport, RunSummary, WorkItem};
pub use retry::RetryPolicy;

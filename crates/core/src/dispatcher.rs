//! Batch dispatcher
//!
//! Runs a handler over every work item with:
//! - a semaphore gate bounding concurrent handler invocations
//! - contiguous batches joined with a barrier, plus a cooldown between batches
//! - a fixed pause before each handler call
//! - per-item isolation: errors, panics and timeouts become failure outcomes
//!
//! # Architecture
//!
//! ```text
//! items ──► [batch 0] ──barrier──► sleep ──► [batch 1] ──barrier──► ... ──► RunReport
//!              │
//!              ▼
//!     ┌───────────────────────────────┐
//!     │  JoinSet (one task per item)  │
//!     │  acquire permit ─► pause ─►   │
//!     │  handler (timeout, retry) ─►  │
//!     │  Outcome written at [index]   │
//!     └───────────────────────────────┘
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::{ConfigError, ItemError};
use crate::item::{Outcome, RunReport, WorkItem};
use crate::retry::RetryPolicy;

/// Per-item asynchronous work.
///
/// Implementations own whatever client they need; each call should release
/// its connection before returning, on success and on error alike.
#[async_trait]
pub trait ItemHandler<T>: Send + Sync + 'static
where
    T: Send + Sync + 'static,
{
    /// Success payload type
    type Output: Send + 'static;

    /// Process one item
    async fn handle(&self, item: &WorkItem<T>) -> Result<Self::Output, ItemError>;
}

/// Adapter turning an async closure into an [`ItemHandler`]
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut, O> ItemHandler<T> for FnHandler<F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(WorkItem<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ItemError>> + Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    async fn handle(&self, item: &WorkItem<T>) -> Result<O, ItemError> {
        (self.f)(item.clone()).await
    }
}

/// Scheduling knobs each item task needs
#[derive(Debug, Clone)]
struct Pacing {
    inter_item_delay: Duration,
    item_timeout: Option<Duration>,
    retry: RetryPolicy,
}

/// Runs handlers over work items in gated, paced batches
///
/// # Example
///
/// ```ignore
/// use refminer_core::{BatchDispatcher, FnHandler, RunConfig};
///
/// let dispatcher = BatchDispatcher::new(RunConfig::new(10, 50))?;
/// let report = dispatcher
///     .run_fn(references, |item| async move { enrich(&item.payload).await })
///     .await;
///
/// for outcome in report.outcomes {
///     // outcome.index() == position in `references`
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BatchDispatcher {
    config: RunConfig,
}

impl BatchDispatcher {
    /// Create a dispatcher, rejecting invalid configuration up front
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run an async closure over every payload
    pub async fn run_fn<T, F, Fut, O>(&self, payloads: Vec<T>, f: F) -> RunReport<O>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(WorkItem<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ItemError>> + Send + 'static,
        O: Send + 'static,
    {
        self.run(payloads, Arc::new(FnHandler::new(f))).await
    }

    /// Run `handler` over every payload.
    ///
    /// Returns exactly one outcome per payload, ordered by original index.
    /// Never fails as a whole: every per-item problem is an outcome.
    #[instrument(skip_all, fields(run_id, items = payloads.len()))]
    pub async fn run<T, H>(&self, payloads: Vec<T>, handler: Arc<H>) -> RunReport<H::Output>
    where
        T: Send + Sync + 'static,
        H: ItemHandler<T>,
    {
        let run_id = Uuid::now_v7();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        let started = Instant::now();
        let total = payloads.len();
        let batch_count = self.config.batch_count(total);

        info!(
            total,
            batches = batch_count,
            max_concurrent = self.config.max_concurrent,
            batch_size = self.config.batch_size,
            "Starting run"
        );

        let mut slots: Vec<Option<Outcome<H::Output>>> = (0..total).map(|_| None).collect();
        let gate = Arc::new(Semaphore::new(self.config.max_concurrent));
        let pacing = Pacing {
            inter_item_delay: self.config.inter_item_delay,
            item_timeout: self.config.item_timeout,
            retry: self.config.retry.clone(),
        };

        let mut remaining = WorkItem::from_payloads(payloads).into_iter();
        let mut batch_number = 0;

        loop {
            let batch: Vec<WorkItem<T>> = remaining.by_ref().take(self.config.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            batch_number += 1;

            let first = batch[0].index;
            let size = batch.len();
            info!(
                batch = batch_number,
                of = batch_count,
                size,
                "Dispatching batch"
            );

            let mut tasks = JoinSet::new();
            for item in batch {
                tasks.spawn(run_item(
                    item,
                    Arc::clone(&handler),
                    Arc::clone(&gate),
                    pacing.clone(),
                ));
            }

            // Barrier: the whole batch settles before anything else is scheduled
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => {
                        let index = outcome.index();
                        slots[index] = Some(outcome);
                    }
                    Err(e) => {
                        error!(batch = batch_number, error = %e, "Item task did not complete");
                    }
                }
            }

            for (index, slot) in slots.iter_mut().enumerate().skip(first).take(size) {
                if slot.is_none() {
                    *slot = Some(Outcome::failure(index, ItemError::Cancelled));
                }
            }

            let failed = slots[first..first + size]
                .iter()
                .filter(|s| matches!(s, Some(Outcome::Failure { .. })))
                .count();
            info!(
                batch = batch_number,
                succeeded = size - failed,
                failed,
                "Batch complete"
            );

            if batch_number < batch_count && !self.config.inter_batch_delay.is_zero() {
                debug!(delay_ms = self.config.inter_batch_delay.as_millis() as u64, "Cooling down");
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }
        }

        let outcomes: Vec<Outcome<H::Output>> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or_else(|| Outcome::failure(index, ItemError::Cancelled)))
            .collect();

        let report = RunReport {
            run_id,
            outcomes,
            elapsed: started.elapsed(),
        };

        info!(
            total = report.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Run finished"
        );

        report
    }
}

/// Execute one item: gate, pause, handler (with timeout and retries)
async fn run_item<T, H>(
    item: WorkItem<T>,
    handler: Arc<H>,
    gate: Arc<Semaphore>,
    pacing: Pacing,
) -> Outcome<H::Output>
where
    T: Send + Sync + 'static,
    H: ItemHandler<T>,
{
    let index = item.index;

    // Permit is held until this function returns, whatever the exit path
    let _permit = match gate.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return Outcome::failure(index, ItemError::Cancelled),
    };

    let mut attempt: u32 = 1;
    loop {
        if !pacing.inter_item_delay.is_zero() {
            tokio::time::sleep(pacing.inter_item_delay).await;
        }

        let result = attempt_once(handler.as_ref(), &item, pacing.item_timeout).await;

        match result {
            Ok(payload) => {
                debug!(index, attempt, "Item succeeded");
                return Outcome::success(index, payload);
            }
            Err(e) if pacing.retry.should_retry(&e, attempt) => {
                let delay = pacing.retry.backoff(attempt, pacing.item_timeout);
                attempt += 1;
                debug!(
                    index,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying item"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(index, attempt, error = %e, "Item failed");
                return Outcome::failure(index, e);
            }
        }
    }
}

async fn attempt_once<T, H>(
    handler: &H,
    item: &WorkItem<T>,
    timeout: Option<Duration>,
) -> Result<H::Output, ItemError>
where
    T: Send + Sync + 'static,
    H: ItemHandler<T>,
{
    let call = AssertUnwindSafe(handler.handle(item)).catch_unwind();

    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(caught) => caught,
            Err(_) => return Err(ItemError::Timeout(limit)),
        },
        None => call.await,
    };

    caught.unwrap_or_else(|panic| Err(ItemError::Panicked(panic_message(panic.as_ref()))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

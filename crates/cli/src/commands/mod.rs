// Job commands and the flags they share

pub mod analyze;
pub mod enrich;
pub mod extract;
pub mod upload;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use refminer_core::{BatchDispatcher, ItemError, ItemHandler, RetryPolicy, RunConfig, WorkItem};
use refminer_dify::{ApiConfig, DifyClient};
use refminer_io::{write_report, ReportPayload};
use tracing::info;

use crate::output::{JobSummary, OutputFormat};

/// Connection flags for the remote API
#[derive(Debug, Clone, Args)]
pub struct ApiArgs {
    /// Application API key
    #[arg(long, env = "REFMINER_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// API base URL (without /v1)
    #[arg(long, env = "REFMINER_BASE_URL", default_value = "https://api.dify.ai")]
    pub base_url: String,

    /// End-user identifier sent with each request
    #[arg(long, env = "REFMINER_USER", default_value = "refminer")]
    pub user: String,

    /// Connect timeout in seconds
    #[arg(long, default_value = "10")]
    pub connect_timeout: u64,

    /// Whole-request timeout in seconds
    #[arg(long, env = "REFMINER_REQUEST_TIMEOUT", default_value = "300")]
    pub request_timeout: u64,

    /// Longest gap between streamed chunks, in seconds
    #[arg(long, env = "REFMINER_IDLE_TIMEOUT", default_value = "60")]
    pub idle_timeout: u64,
}

impl ApiArgs {
    pub fn client(&self) -> Result<DifyClient> {
        let config = ApiConfig::new(&self.api_key)
            .with_base_url(&self.base_url)
            .with_user(&self.user)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_request_timeout(Duration::from_secs(self.request_timeout))
            .with_idle_timeout(Duration::from_secs(self.idle_timeout));
        config.validate().context("Invalid API configuration")?;
        DifyClient::new(config).context("Failed to create API client")
    }
}

/// Scheduling flags; unset values keep the job's own defaults
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Maximum requests in flight
    #[arg(long, env = "REFMINER_MAX_CONCURRENT")]
    pub concurrency: Option<usize>,

    /// Items per batch
    #[arg(long, env = "REFMINER_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Pause before each request, in milliseconds
    #[arg(long, env = "REFMINER_ITEM_DELAY_MS")]
    pub item_delay_ms: Option<u64>,

    /// Pause between batches, in milliseconds
    #[arg(long, env = "REFMINER_BATCH_DELAY_MS")]
    pub batch_delay_ms: Option<u64>,

    /// Per-item timeout in seconds (0 disables it)
    #[arg(long, env = "REFMINER_ITEM_TIMEOUT")]
    pub item_timeout: Option<u64>,

    /// Extra attempts for transient failures (timeouts, 429, 5xx)
    #[arg(long, env = "REFMINER_RETRIES", default_value = "0")]
    pub retries: u32,
}

impl RunArgs {
    /// Overlay the flags on a job's default configuration
    pub fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(n) = self.concurrency {
            config = config.with_max_concurrent(n);
        }
        if let Some(n) = self.batch_size {
            config = config.with_batch_size(n);
        }
        if let Some(ms) = self.item_delay_ms {
            config = config.with_inter_item_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.batch_delay_ms {
            config = config.with_inter_batch_delay(Duration::from_millis(ms));
        }
        match self.item_timeout {
            Some(0) => config = config.without_item_timeout(),
            Some(secs) => config = config.with_item_timeout(Duration::from_secs(secs)),
            None => {}
        }
        if self.retries > 0 {
            config = config.with_retry(RetryPolicy::exponential().with_max_attempts(self.retries + 1));
        }
        config
    }
}

/// Payload of a column-sourced item; a blank source cell fails the item
pub fn cell_value(item: &WorkItem<String>) -> Result<&str, ItemError> {
    if item.payload.is_empty() {
        return Err(ItemError::input("blank cell"));
    }
    Ok(&item.payload)
}

/// Global options every job needs
#[derive(Debug, Clone, Copy)]
pub struct JobContext {
    pub output: OutputFormat,
    pub quiet: bool,
}

/// Dispatch `handler` over `payloads`, write the report and print the summary.
///
/// `inputs[i]` is the human-readable input recorded for item `i`.
pub async fn run_job<T, H>(
    job: &str,
    payloads: Vec<T>,
    inputs: Vec<String>,
    handler: H,
    config: RunConfig,
    report: &Path,
    ctx: JobContext,
) -> Result<()>
where
    T: Send + Sync + 'static,
    H: ItemHandler<T>,
    H::Output: ReportPayload,
{
    let dispatcher = BatchDispatcher::new(config).context("Invalid run configuration")?;
    info!(job, items = payloads.len(), config = ?dispatcher.config(), "Starting job");

    let run = dispatcher.run(payloads, Arc::new(handler)).await;
    let summary = run.summary();

    write_report(report, &inputs, &run.outcomes)
        .with_context(|| format!("Failed to write report: {}", report.display()))?;

    JobSummary::new(job, &summary, report).print(ctx.output, ctx.quiet)
}

// Analyze command - extract cited sentences from uploaded page images

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use refminer_core::{ItemError, ItemHandler, RunConfig, WorkItem};
use refminer_dify::{prompts, ChatFile, DifyClient};
use refminer_io::read_column;

use super::{cell_value, run_job, ApiArgs, JobContext, RunArgs};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Upload report (or any table) listing remote file ids
    #[arg(long, short)]
    pub input: PathBuf,

    /// Column holding the remote file id
    #[arg(long, default_value = "remote_id")]
    pub column: String,

    /// CSV report to write
    #[arg(long, short)]
    pub report: PathBuf,

    #[command(flatten)]
    pub api: ApiArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Image jobs are heavier than text ones: 5 in flight, 10 per batch
pub fn default_config() -> RunConfig {
    RunConfig::new(5, 10)
        .with_inter_item_delay(Duration::from_millis(500))
        .with_inter_batch_delay(Duration::from_secs(2))
}

/// Asks the blocking chat endpoint about one uploaded image
pub struct AnalyzeHandler {
    client: DifyClient,
}

impl AnalyzeHandler {
    pub fn new(client: DifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ItemHandler<String> for AnalyzeHandler {
    type Output = String;

    async fn handle(&self, item: &WorkItem<String>) -> Result<String, ItemError> {
        let files = vec![ChatFile::uploaded_image(cell_value(item)?)];
        Ok(self
            .client
            .chat_blocking(prompts::CITATION_EXTRACTION, files)
            .await?)
    }
}

pub async fn run(args: AnalyzeArgs, ctx: JobContext) -> Result<()> {
    let file_ids = read_column(&args.input, &args.column)
        .with_context(|| format!("Failed to read input: {}", args.input.display()))?;
    let client = args.api.client()?;
    let config = args.run.apply(default_config());

    run_job(
        "analyze",
        file_ids.clone(),
        file_ids,
        AnalyzeHandler::new(client),
        config,
        &args.report,
        ctx,
    )
    .await
}

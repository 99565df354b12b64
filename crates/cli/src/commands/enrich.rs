// Enrich command - stream structured metadata for each reference

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use refminer_core::{ItemError, ItemHandler, RunConfig, WorkItem};
use refminer_dify::{prompts, DifyClient};
use refminer_io::read_column;

use super::{cell_value, run_job, ApiArgs, JobContext, RunArgs};

#[derive(Debug, Args)]
pub struct EnrichArgs {
    /// CSV or spreadsheet with one reference per row
    #[arg(long, short)]
    pub input: PathBuf,

    /// Column holding the reference text
    #[arg(long, default_value = "content")]
    pub column: String,

    /// CSV report to write
    #[arg(long, short)]
    pub report: PathBuf,

    #[command(flatten)]
    pub api: ApiArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Sends one reference through the streaming completion endpoint
pub struct EnrichHandler {
    client: DifyClient,
}

impl EnrichHandler {
    pub fn new(client: DifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ItemHandler<String> for EnrichHandler {
    type Output = String;

    async fn handle(&self, item: &WorkItem<String>) -> Result<String, ItemError> {
        let prompt = prompts::reference_metadata(cell_value(item)?);
        Ok(self.client.completion_stream(&prompt).await?)
    }
}

pub async fn run(args: EnrichArgs, ctx: JobContext) -> Result<()> {
    let references = read_column(&args.input, &args.column)
        .with_context(|| format!("Failed to read input: {}", args.input.display()))?;
    let client = args.api.client()?;
    let config = args.run.apply(RunConfig::default());

    run_job(
        "enrich",
        references.clone(),
        references,
        EnrichHandler::new(client),
        config,
        &args.report,
        ctx,
    )
    .await
}

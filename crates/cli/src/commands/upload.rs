// Upload command - push page images to the API file store

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use refminer_core::{ItemError, ItemHandler, RunConfig, WorkItem};
use refminer_dify::{DifyClient, UploadedFile};
use refminer_io::list_files;

use super::{run_job, ApiArgs, JobContext, RunArgs};

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Directory holding the images
    #[arg(long, short)]
    pub dir: PathBuf,

    /// File extensions to upload (repeatable)
    #[arg(long = "ext", default_value = "png")]
    pub extensions: Vec<String>,

    /// CSV report to write; its remote_id column feeds `analyze`
    #[arg(long, short)]
    pub report: PathBuf,

    #[command(flatten)]
    pub api: ApiArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// All files in one batch, 5 uploads in flight, no pacing
pub fn default_config(files: usize) -> RunConfig {
    RunConfig::new(5, files.max(1))
        .with_inter_item_delay(Duration::ZERO)
        .with_inter_batch_delay(Duration::ZERO)
}

/// Uploads one local file
pub struct UploadHandler {
    client: DifyClient,
}

impl UploadHandler {
    pub fn new(client: DifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ItemHandler<PathBuf> for UploadHandler {
    type Output = UploadedFile;

    async fn handle(&self, item: &WorkItem<PathBuf>) -> Result<UploadedFile, ItemError> {
        Ok(self.client.upload_file(&item.payload).await?)
    }
}

pub async fn run(args: UploadArgs, ctx: JobContext) -> Result<()> {
    let files = list_files(&args.dir, &args.extensions)
        .with_context(|| format!("Failed to list files in {}", args.dir.display()))?;
    let client = args.api.client()?;
    let config = args.run.apply(default_config(files.len()));

    let inputs: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();

    run_job(
        "upload",
        files,
        inputs,
        UploadHandler::new(client),
        config,
        &args.report,
        ctx,
    )
    .await
}

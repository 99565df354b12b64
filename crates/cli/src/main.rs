// Refminer CLI
//
// Design Decision: Use clap derive; every flag also reads an environment variable.
// Design Decision: Support text/json/yaml summaries for scripting.
// Design Decision: Configuration errors abort before any request; per-item failures only
// show up in the report and the summary, and the process still exits 0.

mod commands;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use refminer_core::telemetry::{init_telemetry, LogFormat, TelemetryConfig};

use commands::JobContext;

#[derive(Parser)]
#[command(name = "refminer")]
#[command(about = "Refminer - batch reference extraction and enrichment against an LLM API")]
#[command(version)]
pub struct Cli {
    /// Output format for the run summary
    #[arg(long, short, global = true, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, env = "REFMINER_LOG_FORMAT", default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split the reference list out of extracted document text
    ExtractReferences(commands::extract::ExtractArgs),

    /// Stream structured metadata for each reference
    Enrich(commands::enrich::EnrichArgs),

    /// Upload page images to the API file store
    Upload(commands::upload::UploadArgs),

    /// Extract cited sentences from uploaded page images
    Analyze(commands::analyze::AnalyzeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let telemetry = TelemetryConfig::from_env().with_format(LogFormat::parse(&cli.log_format));
    init_telemetry(telemetry).context("Failed to initialize logging")?;

    let ctx = JobContext {
        output: output::OutputFormat::parse(&cli.output),
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::ExtractReferences(args) => commands::extract::run(args, ctx),
        Commands::Enrich(args) => commands::enrich::run(args, ctx).await,
        Commands::Upload(args) => commands::upload::run(args, ctx).await,
        Commands::Analyze(args) => commands::analyze::run(args, ctx).await,
    }
}

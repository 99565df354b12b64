// Extract-references command - split a reference list out of document text

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use refminer_io::{write_references, ReferenceSplitter};
use serde_json::json;

use super::JobContext;
use crate::output::print_field;

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Plain-text file holding the document text
    #[arg(long, short)]
    pub input: PathBuf,

    /// CSV file to write (`number,content`)
    #[arg(long, short)]
    pub report: PathBuf,

    /// Heading that opens the reference section
    #[arg(long, default_value = ReferenceSplitter::DEFAULT_HEADING)]
    pub heading: String,
}

pub fn run(args: ExtractArgs, ctx: JobContext) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;

    let splitter = ReferenceSplitter::with_heading(&args.heading)
        .with_context(|| format!("Invalid heading: {}", args.heading))?;
    let references = splitter.split(&text);

    if references.is_empty() {
        tracing::warn!(heading = %args.heading, "No reference section found");
    }

    let written = write_references(&args.report, &references)
        .with_context(|| format!("Failed to write references: {}", args.report.display()))?;

    if ctx.output.is_text() {
        if !ctx.quiet {
            print_field("References", &written.to_string());
            print_field("Report", &args.report.display().to_string());
        }
    } else {
        ctx.output.print_value(&json!({
            "job": "extract-references",
            "references": written,
            "report": args.report.display().to_string(),
        }))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_extract_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("guideline.txt");
        let report = dir.path().join("refs.csv");
        std::fs::write(&input, "Body.\n\nReferences\n1. First.\n2. Second.\n").unwrap();

        let args = ExtractArgs {
            input,
            report: report.clone(),
            heading: "References".to_string(),
        };
        let ctx = JobContext {
            output: OutputFormat::Text,
            quiet: true,
        };
        run(args, ctx).unwrap();

        let contents = refminer_io::read_column(&report, "content").unwrap();
        assert_eq!(contents, vec!["First.".to_string(), "Second.".to_string()]);
    }

    #[test]
    fn test_missing_input_is_error() {
        let args = ExtractArgs {
            input: PathBuf::from("/nonexistent/guideline.txt"),
            report: PathBuf::from("/tmp/unused.csv"),
            heading: "References".to_string(),
        };
        let ctx = JobContext {
            output: OutputFormat::Text,
            quiet: true,
        };
        assert!(run(args, ctx).is_err());
    }
}

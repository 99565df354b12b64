// Output formatting for CLI

use std::path::Path;

use anyhow::Result;
use refminer_core::RunSummary;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => OutputFormat::Json,
            "yaml" => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        }
    }

    pub fn print_value<T: Serialize>(&self, value: &T) -> Result<()> {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(value)?);
            }
            OutputFormat::Text => {
                // Text format is handled by each command
            }
        }
        Ok(())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OutputFormat::Text)
    }
}

/// Summary printed after a batch job
#[derive(Debug, Serialize)]
pub struct JobSummary<'a> {
    pub job: &'a str,
    #[serde(flatten)]
    pub run: &'a RunSummary,
    pub report: String,
}

impl<'a> JobSummary<'a> {
    pub fn new(job: &'a str, run: &'a RunSummary, report: &Path) -> Self {
        Self {
            job,
            run,
            report: report.display().to_string(),
        }
    }

    pub fn print(&self, output: OutputFormat, quiet: bool) -> Result<()> {
        if !output.is_text() {
            return output.print_value(self);
        }
        if quiet {
            return Ok(());
        }

        print_field("Job", self.job);
        print_field("Run", &self.run.run_id.to_string());
        print_field("Total", &self.run.total.to_string());
        print_field("Succeeded", &self.run.succeeded.to_string());
        print_field("Failed", &self.run.failed.to_string());
        print_field("Elapsed", &format_elapsed(self.run.elapsed_ms));
        print_field("Report", &self.report);
        Ok(())
    }
}

/// Print a simple key-value pair for text output
pub fn print_field(label: &str, value: &str) {
    println!("{:<14} {}", format!("{}:", label), value);
}

fn format_elapsed(ms: u64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(250), "250ms");
        assert_eq!(format_elapsed(2_500), "2.5s");
        assert_eq!(format_elapsed(125_000), "2m 5s");
    }
}

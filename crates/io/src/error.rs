// Error types for sources and sinks

use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce work items. Always fatal for the job.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("input not found: {0}")]
    NotFound(PathBuf),

    #[error("column '{column}' not found in {path} (available: {available})")]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: String,
    },

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("{0} has no worksheets")]
    NoSheets(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to persist or re-read a report
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

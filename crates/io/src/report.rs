//! CSV report sink.
//!
//! One row per outcome, in outcome order. Failed items keep their row with
//! status `error` and an `ERROR: <description>` result, so every input stays
//! auditable after the run.

use std::path::Path;

use refminer_core::Outcome;
use refminer_dify::UploadedFile;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SinkError;

const ERROR_PREFIX: &str = "ERROR: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Error,
}

/// One persisted row. Upload columns stay empty for the other jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: usize,
    pub input: String,
    pub status: ReportStatus,
    pub result: String,
    pub remote_id: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub created_at: Option<String>,
}

impl ReportRow {
    fn new(id: usize, input: String, status: ReportStatus) -> Self {
        Self {
            id,
            input,
            status,
            result: String::new(),
            remote_id: None,
            size: None,
            mime_type: None,
            created_at: None,
        }
    }

    /// Convert back into an outcome carrying the result text
    pub fn to_outcome(&self) -> Outcome<String> {
        match self.status {
            ReportStatus::Success => Outcome::success(self.id, self.result.clone()),
            ReportStatus::Error => Outcome::failure(
                self.id,
                self.result
                    .strip_prefix(ERROR_PREFIX)
                    .unwrap_or(&self.result),
            ),
        }
    }
}

/// How a success payload fills its report row
pub trait ReportPayload {
    fn fill(&self, row: &mut ReportRow);
}

impl ReportPayload for String {
    fn fill(&self, row: &mut ReportRow) {
        row.result = self.clone();
    }
}

impl ReportPayload for UploadedFile {
    fn fill(&self, row: &mut ReportRow) {
        row.result = self.name.clone();
        row.remote_id = Some(self.id.clone());
        row.size = Some(self.size);
        row.mime_type = self.mime_type.clone();
        row.created_at = self.created_at_utc().map(|t| t.to_rfc3339());
    }
}

/// Build report rows; `inputs[i]` is the original reference of outcome `i`
pub fn report_rows<T: ReportPayload>(inputs: &[String], outcomes: &[Outcome<T>]) -> Vec<ReportRow> {
    outcomes
        .iter()
        .map(|outcome| {
            let index = outcome.index();
            let input = inputs.get(index).cloned().unwrap_or_default();
            match outcome {
                Outcome::Success { payload, .. } => {
                    let mut row = ReportRow::new(index, input, ReportStatus::Success);
                    payload.fill(&mut row);
                    row
                }
                Outcome::Failure { error, .. } => {
                    let mut row = ReportRow::new(index, input, ReportStatus::Error);
                    row.result = format!("{}{}", ERROR_PREFIX, error);
                    row
                }
            }
        })
        .collect()
}

/// Write the report; returns the number of rows written
pub fn write_report<T: ReportPayload>(
    path: &Path,
    inputs: &[String],
    outcomes: &[Outcome<T>],
) -> Result<usize, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let rows = report_rows(inputs, outcomes);
    let mut writer = csv::Writer::from_path(path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Report written");
    Ok(rows.len())
}

/// Read a report back; rows must be in id order starting at 0
pub fn read_report(path: &Path) -> Result<Vec<ReportRow>, SinkError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();

    for (position, record) in reader.deserialize::<ReportRow>().enumerate() {
        let row = record?;
        if row.id != position {
            return Err(SinkError::InvalidRow {
                row: position,
                message: format!("expected id {}, found {}", position, row.id),
            });
        }
        rows.push(row);
    }

    Ok(rows)
}

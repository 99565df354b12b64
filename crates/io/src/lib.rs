// Job inputs and outputs
//
// Sources turn files into ordered payload lists (one per spreadsheet row or
// per matching file). The report sink writes dispatcher outcomes back out as
// CSV, one row per outcome, preserving order.

mod error;
pub mod references;
pub mod report;
pub mod source;

pub use error::{SinkError, SourceError};
pub use references::{extract_references, write_references, Reference, ReferenceSplitter};
pub use report::{read_report, write_report, ReportPayload, ReportRow, ReportStatus};
pub use source::{list_files, read_column};

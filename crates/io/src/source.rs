//! Input sources: one payload per spreadsheet row, or one per matching file.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, warn};

use crate::error::SourceError;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Read every value of `column` from a CSV file or the first sheet of a
/// spreadsheet. The first row is the header.
///
/// The result holds one trimmed value per data row, blank rows included as
/// empty strings, so position `i` is always data row `i`.
pub fn read_column(path: &Path, column: &str) -> Result<Vec<String>, SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let ext = extension_of(path);
    let cells = match ext.as_deref() {
        Some("csv") => read_csv_column(path, column)?,
        Some(e) if SPREADSHEET_EXTENSIONS.contains(&e) => read_sheet_column(path, column)?,
        _ => return Err(SourceError::UnsupportedFormat(path.to_path_buf())),
    };

    let mut blank = 0usize;
    let values: Vec<String> = cells
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let value = value.trim().to_string();
            if value.is_empty() {
                blank += 1;
                // +2: header row and 1-based numbering
                warn!(row = row + 2, column, "Blank cell");
            }
            value
        })
        .collect();

    debug!(
        path = %path.display(),
        column,
        rows = values.len(),
        blank,
        "Read input column"
    );
    Ok(values)
}

fn read_csv_column(path: &Path, column: &str) -> Result<Vec<String>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let idx = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| SourceError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
            available: headers.iter().collect::<Vec<_>>().join(", "),
        })?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        values.push(record.get(idx).unwrap_or_default().to_string());
    }
    Ok(values)
}

fn read_sheet_column(path: &Path, column: &str) -> Result<Vec<String>, SourceError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SourceError::NoSheets(path.to_path_buf()))?;
    let range = workbook.worksheet_range(&sheet)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();

    let idx = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| SourceError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
            available: headers.join(", "),
        })?;

    Ok(rows
        .map(|row| row.get(idx).map(cell_text).unwrap_or_default())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR:{e:?}"),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Regular files directly inside `dir` whose extension matches one of
/// `extensions` (case-insensitive), sorted by path.
pub fn list_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, SourceError> {
    if !dir.is_dir() {
        return Err(SourceError::NotFound(dir.to_path_buf()));
    }

    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = extension_of(&path) {
            if wanted.contains(&ext) {
                files.push(path);
            }
        }
    }

    files.sort();
    debug!(dir = %dir.display(), files = files.len(), "Listed input files");
    Ok(files)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.csv");
        std::fs::write(
            &path,
            "number,content\n1,\"Smith J. Title, with comma. JAMA. 2020.\"\n2,  \n3,Doe A. Other. BMJ. 2019.\n",
        )
        .unwrap();

        let values = read_column(&path, "content").unwrap();
        assert_eq!(
            values,
            vec![
                "Smith J. Title, with comma. JAMA. 2020.".to_string(),
                String::new(),
                "Doe A. Other. BMJ. 2019.".to_string(),
            ]
        );
    }

    #[test]
    fn test_blank_rows_keep_their_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.csv");
        std::fs::write(&path, "id,remote_id\n0,file-a\n1,\n2,file-c\n").unwrap();

        let ids = read_column(&path, "remote_id").unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[1], "");
        assert_eq!(ids[2], "file-c");
    }

    #[test]
    fn test_missing_column_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.csv");
        std::fs::write(&path, "number,content\n1,x\n").unwrap();

        let err = read_column(&path, "remote_id").unwrap_err();
        match err {
            SourceError::MissingColumn { available, .. } => assert_eq!(available, "number, content"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = read_column(Path::new("/nonexistent/input.csv"), "content").unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.json");
        std::fs::write(&path, "[]").unwrap();

        let err = read_column(&path, "content").unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-2.png", "page-1.PNG", "notes.txt", "page-3.jpg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = list_files(dir.path(), &["png".to_string()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-1.PNG", "page-2.png"]);

        let files = list_files(dir.path(), &[".png".to_string(), "jpg".to_string()]).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_list_files_missing_dir() {
        let err = list_files(Path::new("/nonexistent/pics"), &["png".to_string()]).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}

//! Numbered reference list splitting.
//!
//! Input is plain text already extracted from a document. The section starts
//! after a `References` heading and runs to the first blank line (or the end of
//! the text). Each entry starts on a line of the form `N. content`; following
//! lines up to the next numbered line belong to the same entry.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SinkError;

/// One entry of a numbered reference list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub number: u32,
    pub content: String,
}

/// Splits reference sections; the heading text is configurable
#[derive(Debug, Clone)]
pub struct ReferenceSplitter {
    heading: Regex,
    entry: Regex,
}

impl ReferenceSplitter {
    pub const DEFAULT_HEADING: &'static str = "References";

    pub fn new() -> Result<Self, regex::Error> {
        Self::with_heading(Self::DEFAULT_HEADING)
    }

    /// Use a different literal heading, e.g. `Bibliography`
    pub fn with_heading(heading: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            heading: Regex::new(&format!(r"{}\s*", regex::escape(heading)))?,
            entry: Regex::new(r"^\s*(\d+)\.\s+(.*)$")?,
        })
    }

    /// The text between the heading and the next blank line
    fn section<'a>(&self, text: &'a str) -> Option<&'a str> {
        let heading = self.heading.find(text)?;
        let rest = &text[heading.end()..];
        let end = rest.find("\n\n").unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// Split the reference section of `text` into numbered entries.
    ///
    /// Returns an empty list when the heading is missing.
    pub fn split(&self, text: &str) -> Vec<Reference> {
        let text = text.replace("\r\n", "\n");
        let Some(section) = self.section(&text) else {
            return Vec::new();
        };

        let mut references: Vec<Reference> = Vec::new();
        let mut current: Option<(u32, Vec<&str>)> = None;

        for line in section.lines() {
            let numbered = self
                .entry
                .captures(line)
                .and_then(|caps| Some((caps[1].parse::<u32>().ok()?, caps.get(2)?.as_str())));

            match numbered {
                Some((number, first)) => {
                    if let Some((n, lines)) = current.take() {
                        references.push(finish_entry(n, &lines));
                    }
                    current = Some((number, vec![first]));
                }
                None => {
                    if let Some((_, lines)) = current.as_mut() {
                        lines.push(line);
                    }
                }
            }
        }
        if let Some((n, lines)) = current {
            references.push(finish_entry(n, &lines));
        }

        references
    }
}

/// Split with the default `References` heading
pub fn extract_references(text: &str) -> Result<Vec<Reference>, regex::Error> {
    Ok(ReferenceSplitter::new()?.split(text))
}

fn finish_entry(number: u32, lines: &[&str]) -> Reference {
    Reference {
        number,
        content: lines.join("\n").trim().to_string(),
    }
}

/// Write references as CSV with `number,content` columns
pub fn write_references(path: &Path, references: &[Reference]) -> Result<usize, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for reference in references {
        writer.serialize(reference)?;
    }
    writer.flush()?;

    info!(path = %path.display(), references = references.len(), "References written");
    Ok(references.len())
}

//! Parser for instruction documents
//!
//! A document is an optional block of `@key: value` lines, a blank
//! separator line, and free-form instructions running to the end of the
//! file:
//!
//! ```text
//! @language: python
//! @output: hello.py
//!
//! Print hello world
//! ```

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref METADATA_LINE: Regex = Regex::new(r"^@([a-zA-Z0-9_]+):\s*(.*)$").unwrap();
}

/// A parsed instruction document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// The text exactly as read from disk
    pub raw_text: String,
    /// Leading `@key: value` pairs; later duplicates win
    pub metadata: HashMap<String, String>,
    /// Body sent to the generation service
    pub instructions: String,
}

impl SourceDocument {
    pub fn language(&self) -> Option<&str> {
        self.metadata.get("language").map(String::as_str)
    }

    pub fn output(&self) -> Option<&str> {
        self.metadata.get("output").map(String::as_str)
    }
}

/// Match a single line against the metadata pattern.
pub fn parse_metadata_line(line: &str) -> Option<(String, String)> {
    METADATA_LINE
        .captures(line.trim())
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
}

/// Split raw document text into metadata and instructions.
///
/// Never fails. Metadata is only recognized as a run of `@` lines at the
/// very start of the text; `@` lines that do not match `@key: value` are
/// skipped without ending the run. The instructions begin after the first
/// blank line that follows at least one metadata entry. When no such
/// separator is found the instructions are the whole text.
///
/// # Arguments
///
/// * `raw_text` - Document contents as read from disk
///
/// # Returns
///
/// The parsed [`SourceDocument`]
pub fn parse_document(raw_text: &str) -> SourceDocument {
    let lines: Vec<&str> = raw_text.split('\n').collect();
    let mut metadata = HashMap::new();
    let mut instructions_start = 0;

    for (index, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with('@') {
            if let Some((key, value)) = parse_metadata_line(line) {
                metadata.insert(key, value);
            }
        } else if line.trim().is_empty() && !metadata.is_empty() {
            instructions_start = index + 1;
            break;
        } else {
            break;
        }
    }

    let instructions = lines[instructions_start..].join("\n");

    SourceDocument {
        raw_text: raw_text.to_string(),
        metadata,
        instructions,
    }
}

//! Works out the target language and artifact path for a document.

use std::path::{Path, PathBuf};

use crate::parser::SourceDocument;

/// Extension used for languages missing from the table
pub const FALLBACK_EXTENSION: &str = "txt";

const EXTENSIONS: &[(&str, &str)] = &[
    ("javascript", "js"),
    ("typescript", "ts"),
    ("python", "py"),
    ("java", "java"),
    ("c#", "cs"),
    ("csharp", "cs"),
    ("c++", "cpp"),
    ("cpp", "cpp"),
    ("c", "c"),
    ("go", "go"),
    ("rust", "rs"),
    ("ruby", "rb"),
    ("php", "php"),
    ("swift", "swift"),
    ("kotlin", "kt"),
    ("html", "html"),
    ("css", "css"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    /// Lower-cased target language
    pub language: String,
    pub output_path: PathBuf,
}

/// File extension for a language, case-insensitive.
///
/// # Arguments
///
/// * `language` - Language name, e.g. `python` or `C#`
///
/// # Returns
///
/// The table extension, or [`FALLBACK_EXTENSION`] for unknown languages
pub fn extension_for(language: &str) -> &'static str {
    let language = language.trim().to_lowercase();
    EXTENSIONS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, ext)| *ext)
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Decide the language and artifact path for a parsed document.
///
/// `@output` is taken relative to the document's directory; without it the
/// document extension is swapped for the language's.
///
/// # Arguments
///
/// * `document` - Parsed document
/// * `document_path` - Where the document was read from
/// * `default_language` - Used when the document has no `@language`
///
/// # Returns
///
/// The lower-cased language and the path to write
pub fn resolve_output(document: &SourceDocument, document_path: &Path, default_language: &str) -> ResolvedOutput {
    let language = document
        .language()
        .filter(|l| !l.is_empty())
        .unwrap_or(default_language)
        .to_lowercase();

    let output_path = match document.output().filter(|o| !o.is_empty()) {
        Some(output) => document_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(output),
        None => document_path.with_extension(extension_for(&language)),
    };

    ResolvedOutput { language, output_path }
}

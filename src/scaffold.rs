//! Starter documents for the `new` command.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::DOCUMENT_EXTENSION;
use crate::error::{CompilerError, Result};
use crate::resolver::extension_for;
use crate::watch_loop::is_document;

pub fn render_template(stem: &str, language: &str) -> String {
    format!(
        "@language: {language}\n@output: {stem}.{ext}\n\nCreate a simple program that does the following:\n1. \n2. \n3. \n\n",
        ext = extension_for(language)
    )
}

/// `name` with the document extension appended when missing.
pub fn document_path(name: &Path) -> PathBuf {
    if is_document(name, DOCUMENT_EXTENSION) {
        name.to_path_buf()
    } else {
        let mut raw = name.as_os_str().to_os_string();
        raw.push(".");
        raw.push(DOCUMENT_EXTENSION);
        PathBuf::from(raw)
    }
}

/// Write a starter document. Refuses to replace an existing file.
pub fn create_document(name: &Path, language: &str) -> Result<PathBuf> {
    let path = document_path(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| {
            let source = if source.kind() == io::ErrorKind::AlreadyExists {
                io::Error::new(io::ErrorKind::AlreadyExists, "file already exists")
            } else {
                source
            };
            CompilerError::Write { path: path.clone(), source }
        })?;

    file.write_all(render_template(&stem, language).as_bytes())
        .map_err(|source| CompilerError::Write { path: path.clone(), source })?;

    Ok(path)
}

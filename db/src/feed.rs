//! Quarterly documents from the upstream extraction feed.
//!
//! The feed drops one JSON file per quarterly into a directory. Files are
//! taken in filename order so repeated imports are reproducible.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use quarterly_core::QuarterlyImport;

use crate::error::{Result, StoreError};

/// Returns the `*.json` files directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Returns [`StoreError::DirectoryNotFound`] if `dir` is not a directory.
pub fn feed_documents(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(StoreError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads one quarterly document.
///
/// # Errors
///
/// Returns [`StoreError::IoError`] if the file cannot be read, or
/// [`StoreError::JsonError`] if it is not a quarterly document.
pub fn load_document(path: impl AsRef<Path>) -> Result<QuarterlyImport> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let document = serde_json::from_reader(reader)?;
    Ok(document)
}

//! Provenance metadata for completed downloads
//!
//! Each finished loan gets a `metadata.json` sidecar the audiobook manager
//! reads. Fields written by the download tool or the user are kept; loanload
//! only adds its provenance tag and fills in a title when none is present.

use crate::error::{LibraryError, LibraryResult};
use loanload_core::Loan;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const METADATA_FILE: &str = "metadata.json";
/// Fixed label marking a book as fetched through the lending service
pub const PROVENANCE_TAG: &str = "libby";

const TAGS_KEY: &str = "tags";
const TITLE_KEY: &str = "title";

/// Adds the provenance tag to `<final_dir>/metadata.json`, creating it if needed
///
/// Returns true when the file was written.
pub fn tag_provenance(final_dir: &Path, loan: &Loan) -> LibraryResult<bool> {
    let path = final_dir.join(METADATA_FILE);
    let mut root = read_metadata(&path)?;
    let mut changed = false;

    if !loan.title.is_empty() && !root.contains_key(TITLE_KEY) {
        root.insert(TITLE_KEY.to_string(), Value::String(loan.title.clone()));
        changed = true;
    }

    let tags = root
        .entry(TAGS_KEY)
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(tags) = tags else {
        return Err(LibraryError::Metadata {
            path,
            reason: format!("'{}' must be an array", TAGS_KEY),
        });
    };
    if !tags.iter().any(|t| t.as_str() == Some(PROVENANCE_TAG)) {
        tags.push(Value::String(PROVENANCE_TAG.to_string()));
        changed = true;
    }

    if changed {
        write_metadata(&path, &Value::Object(root))?;
        log::debug!("Tagged {}", path.display());
    }
    Ok(changed)
}

fn read_metadata(path: &Path) -> LibraryResult<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let contents = fs::read_to_string(path)?;
    match serde_json::from_str(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(LibraryError::Metadata {
            path: path.to_path_buf(),
            reason: "expected a JSON object".to_string(),
        }),
        Err(e) => Err(LibraryError::Metadata {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn write_metadata(path: &Path, value: &Value) -> LibraryResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut contents = serde_json::to_string_pretty(value).map_err(|e| LibraryError::Metadata {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    contents.push('\n');

    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(contents.as_bytes())?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|e| LibraryError::Io(e.error))?;
    Ok(())
}

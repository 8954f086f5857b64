//! The session tool's machine-readable export

use crate::session::mentions_authentication;
use crate::{SourceError, SourceResult};
use loanload_core::{LibraryRecord, Loan};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Libraries and loans from one session tool export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionExport {
    pub libraries: Vec<LibraryRecord>,
    pub loans: Vec<Loan>,
}

/// A library element with its nested loans
#[derive(Deserialize)]
struct LibraryEntry {
    #[serde(flatten)]
    record: LibraryRecord,
    #[serde(default)]
    loans: Vec<Loan>,
}

impl SessionExport {
    /// Parses an export
    ///
    /// The top level is an array whose elements are either library objects
    /// (optionally carrying `loans`) or flat loan objects with an `id`. An
    /// object at the top level is the tool reporting a failure.
    pub fn parse(contents: &str) -> SourceResult<Self> {
        let value: Value = serde_json::from_str(contents)
            .map_err(|e| SourceError::ParseError(format!("invalid JSON: {}", e)))?;

        match value {
            Value::Array(items) => Self::from_items(items),
            Value::Object(map) => Err(Self::classify_failure(&map)),
            other => Err(SourceError::ParseError(format!(
                "expected an array at the top level, found {}",
                type_name(&other)
            ))),
        }
    }

    fn from_items(items: Vec<Value>) -> SourceResult<Self> {
        let mut export = SessionExport::default();

        for (index, item) in items.into_iter().enumerate() {
            let is_flat_loan = match &item {
                Value::Object(map) => map.contains_key("id") && !map.contains_key("loans"),
                other => {
                    return Err(SourceError::ParseError(format!(
                        "element #{} is {}, expected an object",
                        index,
                        type_name(other)
                    )))
                }
            };

            if is_flat_loan {
                let loan: Loan = match serde_json::from_value(item) {
                    Ok(loan) => loan,
                    Err(e) => {
                        log::warn!("Ignoring unreadable loan #{}: {}", index, e);
                        continue;
                    }
                };
                if loan.id.trim().is_empty() {
                    log::warn!("Ignoring loan #{} without an id", index);
                    continue;
                }
                export.loans.push(loan);
            } else {
                // An unreadable element keeps its slot as a nameless record so
                // the reconciler reports it and merges the rest
                let entry: LibraryEntry = match serde_json::from_value(item) {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("Library #{} could not be read: {}", index, e);
                        export.libraries.push(LibraryRecord::default());
                        continue;
                    }
                };
                for mut loan in entry.loans {
                    if loan.website_id.is_empty() {
                        loan.website_id = entry.record.website_id.clone();
                    }
                    if loan.library_name.is_none() && !entry.record.is_malformed() {
                        loan.library_name = Some(entry.record.name.clone());
                    }
                    export.loans.push(loan);
                }
                export.libraries.push(entry.record);
            }
        }

        log::debug!(
            "Parsed export with {} libraries and {} loans",
            export.libraries.len(),
            export.loans.len()
        );
        Ok(export)
    }

    fn classify_failure(map: &Map<String, Value>) -> SourceError {
        let message = map
            .get("error")
            .or_else(|| map.get("message"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if map.get("authenticated") == Some(&Value::Bool(false)) || mentions_authentication(&message)
        {
            return SourceError::AuthenticationRequired(if message.is_empty() {
                "session tool reports not authenticated".to_string()
            } else {
                message
            });
        }
        if !message.is_empty() {
            return SourceError::Unavailable(message);
        }
        SourceError::ParseError("expected an array at the top level, found an object".to_string())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Merges freshly discovered library records into the download tool config
//!
//! `base_url` and `website_id` are discovered on every run and always take the
//! session tool's latest value. Every other field belongs to the user or to the
//! download tool and is never touched. Entries for libraries that are no longer
//! reported are kept.

use crate::document::{BASE_URL_KEY, WEBSITE_ID_KEY};
use crate::{ConfigDocument, LibraryConfig};
use loanload_core::{AppError, LibraryRecord};
use serde_json::Value;
use std::collections::HashMap;

/// What a reconcile pass did to each library it saw
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Libraries that had no entry before this run
    pub added: Vec<String>,
    /// Existing libraries whose discovered fields changed
    pub updated: Vec<String>,
    /// Existing libraries that already matched
    pub unchanged: Vec<String>,
    /// Names reported more than once; the last record won
    pub duplicates: Vec<String>,
    /// Records that could not be merged
    pub skipped: Vec<AppError>,
}

impl ReconcileReport {
    /// True when the reconciled document differs from the one passed in
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }

    /// Number of distinct libraries merged
    pub fn merged_count(&self) -> usize {
        self.added.len() + self.updated.len() + self.unchanged.len()
    }
}

/// Discovered fields of an entry as they were before this run
type Snapshot = Option<(Option<Value>, Option<Value>)>;

fn snapshot(doc: &ConfigDocument, name: &str) -> Snapshot {
    doc.library(name).map(|entry| discovered_fields(&entry))
}

fn discovered_fields(entry: &LibraryConfig) -> (Option<Value>, Option<Value>) {
    (
        entry.get(BASE_URL_KEY).cloned(),
        entry.get(WEBSITE_ID_KEY).cloned(),
    )
}

/// Merges `records` into `doc` in input order
///
/// Never fails: records without a name are skipped and listed in the report.
pub fn reconcile(doc: &mut ConfigDocument, records: &[LibraryRecord]) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    // First-seen order of merged names, with their state before the run
    let mut touched: Vec<(String, Snapshot)> = Vec::new();
    let mut last_website_id: HashMap<String, String> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if let Err(err) = record.validate(index) {
            log::warn!("Skipping library record: {}", err);
            report.skipped.push(err);
            continue;
        }

        let name = record.name.as_str();
        match last_website_id.get(name) {
            Some(previous) => {
                if previous != &record.website_id {
                    log::warn!(
                        "Library '{}' reported twice with website ids '{}' and '{}', keeping the last",
                        name,
                        previous,
                        record.website_id
                    );
                } else {
                    log::debug!("Library '{}' reported twice", name);
                }
                if !report.duplicates.iter().any(|d| d == name) {
                    report.duplicates.push(name.to_string());
                }
            }
            None => touched.push((name.to_string(), snapshot(doc, name))),
        }
        last_website_id.insert(name.to_string(), record.website_id.clone());

        let merged = doc.update_library(name, |entry| {
            entry.set_base_url(&record.base_url);
            entry.set_website_id(&record.website_id);
        });
        if merged.is_none() {
            doc.insert_library(
                name,
                LibraryConfig::new(record.base_url.clone(), record.website_id.clone()),
            );
        }
    }

    for (name, before) in touched {
        match before {
            None => {
                log::info!("Added library '{}'", name);
                report.added.push(name);
            }
            Some(before) => {
                let after = doc.library(&name).map(|entry| discovered_fields(&entry));
                if after.as_ref() == Some(&before) {
                    report.unchanged.push(name);
                } else {
                    log::info!("Updated library '{}'", name);
                    report.updated.push(name);
                }
            }
        }
    }

    report
}

/// By-value form of [`reconcile`] for callers that do not need the report
pub fn reconciled(mut doc: ConfigDocument, records: &[LibraryRecord]) -> ConfigDocument {
    reconcile(&mut doc, records);
    doc
}

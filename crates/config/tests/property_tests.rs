//! Property tests for the reconciler and store over a handful of shaped inputs

use loanload_config::{reconcile, reconciled, ConfigDocument, ConfigStore};
use loanload_core::LibraryRecord;
use serde_json::{json, Value};
use tempfile::TempDir;

fn documents() -> Vec<ConfigDocument> {
    [
        json!({}),
        json!({"libraries": {}}),
        json!({"a": 1, "libraries": {"CityLib": {"pin": "1", "base_url": "x", "website_id": "1"}}}),
        json!({"libraries": {"CityLib": {"pin": null, "format": "mp3"}, "Other": {"pin": "7"}}, "z": [true, null]}),
        json!({"nested": {"deep": {"list": [1, 2, {"k": "v"}]}}, "libraries": {"Odd": {}}}),
    ]
    .into_iter()
    .map(|v| ConfigDocument::from_value(v).expect("valid document"))
    .collect()
}

fn record_sets() -> Vec<Vec<LibraryRecord>> {
    vec![
        vec![],
        vec![LibraryRecord::new("CityLib", "new.example", "2")],
        vec![
            LibraryRecord::new("CityLib", "a", "1"),
            LibraryRecord::new("TownLib", "t", "9"),
            LibraryRecord::new("", "skipped", "3"),
        ],
        vec![
            LibraryRecord::new("Dup", "first", "1"),
            LibraryRecord::new("Dup", "second", "2"),
        ],
    ]
}

#[test]
fn property_user_fields_are_preserved() {
    for doc in documents() {
        for records in record_sets() {
            let merged = reconciled(doc.clone(), &records);
            for name in doc.library_names() {
                let before = doc.library(name).expect("present");
                let after = merged.library(name).expect("never deleted");
                for (key, value) in before.fields() {
                    if key == "base_url" || key == "website_id" {
                        continue;
                    }
                    assert_eq!(after.get(key), Some(value), "{name}.{key} changed");
                }
            }
        }
    }
}

#[test]
fn property_discovered_fields_are_overwritten() {
    for doc in documents() {
        for records in record_sets() {
            let merged = reconciled(doc.clone(), &records);
            let mut last = std::collections::HashMap::new();
            for record in records.iter().filter(|r| !r.is_malformed()) {
                last.insert(record.name.clone(), record);
            }
            for (name, record) in last {
                let entry = merged.library(&name).expect("merged");
                assert_eq!(entry.base_url().as_deref(), Some(record.base_url.as_str()));
                assert_eq!(
                    entry.website_id().as_deref(),
                    Some(record.website_id.as_str())
                );
            }
        }
    }
}

#[test]
fn property_keys_are_a_superset() {
    for doc in documents() {
        for records in record_sets() {
            let merged = reconciled(doc.clone(), &records);
            for name in doc.library_names() {
                assert!(merged.contains_library(name));
            }
            for record in records.iter().filter(|r| !r.is_malformed()) {
                assert!(merged.contains_library(&record.name));
            }
            let before = doc.to_value();
            let after = merged.to_value();
            for key in before.as_object().expect("object").keys() {
                assert!(after.get(key).is_some(), "top-level key {key} dropped");
            }
        }
    }
}

#[test]
fn property_reconcile_is_idempotent() {
    for doc in documents() {
        for records in record_sets() {
            let once = reconciled(doc.clone(), &records);
            let mut twice = once.clone();
            let report = reconcile(&mut twice, &records);
            assert_eq!(once, twice);
            assert!(!report.changed());
        }
    }
}

#[test]
fn property_save_load_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    for (i, doc) in documents().into_iter().enumerate() {
        let store = ConfigStore::new(temp_dir.path().join(format!("config_{i}.json")));
        store.save(&doc)?;
        let first = std::fs::read(store.path())?;

        let loaded = store.load()?;
        assert_eq!(loaded, doc);
        store.save(&loaded)?;
        assert_eq!(std::fs::read(store.path())?, first);

        let parsed: Value = serde_json::from_slice(&first)?;
        assert!(parsed.is_object());
    }
    Ok(())
}

#[test]
fn property_roundtrip_after_adding_libraries_to_a_bare_document(
) -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    for (i, start) in [json!({}), json!({"encode": "mp3"})].into_iter().enumerate() {
        let doc = reconciled(
            ConfigDocument::from_value(start)?,
            &[LibraryRecord::new("CityLib", "https://city.example", "12")],
        );

        let store = ConfigStore::new(temp_dir.path().join(format!("bare_{i}.json")));
        store.save(&doc)?;
        let loaded = store.load()?;

        assert_eq!(loaded.to_value(), doc.to_value());
        assert_eq!(loaded, doc);
    }
    Ok(())
}

//! Integration tests for the configure sequence: lock, load, reconcile, backup, save

use loanload_config::{
    reconcile, ConfigBackupManager, ConfigError, ConfigLock, ConfigStore, Settings, SettingsManager,
};
use loanload_core::{AppError, LibraryRecord};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn setup_store() -> Result<(TempDir, ConfigStore), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let store = ConfigStore::new(temp_dir.path().join("config").join("config.json"));
    Ok((temp_dir, store))
}

#[test]
fn test_first_run_creates_config() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, store) = setup_store()?;
    assert!(!store.exists());

    let _lock = ConfigLock::acquire(store.path())?;
    let mut doc = store.load()?;
    let report = reconcile(
        &mut doc,
        &[LibraryRecord::new("CityLib", "https://city.example", "12")],
    );
    assert!(report.changed());
    store.save(&doc)?;

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path())?)?;
    assert_eq!(
        written,
        json!({
            "libraries": {
                "CityLib": {"base_url": "https://city.example", "website_id": "12", "pin": null}
            }
        })
    );
    Ok(())
}

#[test]
fn test_hand_edited_file_keeps_everything_not_owned() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, store) = setup_store()?;
    fs::create_dir_all(store.path().parent().ok_or("no parent")?)?;
    fs::write(
        store.path(),
        r#"{
  "output": {"format": "m4b", "chapters": true},
  "libraries": {
    "CityLib": {"pin": "1234", "base_url": "old.example", "website_id": "1", "card": "A-9"},
    "Retired": {"pin": "5678"}
  },
  "timeout": 90
}
"#,
    )?;

    let mut doc = store.load()?;
    reconcile(
        &mut doc,
        &[
            LibraryRecord::new("CityLib", "new.example", "2"),
            LibraryRecord::new("TownLib", "t.example", "9"),
        ],
    );
    store.save(&doc)?;

    let contents = fs::read_to_string(store.path())?;
    let written: serde_json::Value = serde_json::from_str(&contents)?;
    assert_eq!(written["output"], json!({"format": "m4b", "chapters": true}));
    assert_eq!(written["timeout"], json!(90));
    assert_eq!(written["libraries"]["CityLib"]["pin"], json!("1234"));
    assert_eq!(written["libraries"]["CityLib"]["card"], json!("A-9"));
    assert_eq!(written["libraries"]["CityLib"]["base_url"], json!("new.example"));
    assert_eq!(written["libraries"]["Retired"], json!({"pin": "5678"}));
    assert_eq!(written["libraries"]["TownLib"]["pin"], json!(null));

    // Top-level order survives
    let output_at = contents.find("\"output\"").ok_or("output missing")?;
    let libraries_at = contents.find("\"libraries\"").ok_or("libraries missing")?;
    let timeout_at = contents.find("\"timeout\"").ok_or("timeout missing")?;
    assert!(output_at < libraries_at && libraries_at < timeout_at);
    Ok(())
}

#[test]
fn test_corrupt_config_is_never_overwritten() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, store) = setup_store()?;
    fs::create_dir_all(store.path().parent().ok_or("no parent")?)?;
    fs::write(store.path(), "{\"libraries\": {\"CityLib\": ")?;

    let err = store.load().expect_err("Corrupt file must not load");
    let app_err = AppError::from(err);
    assert!(matches!(app_err, AppError::ConfigCorrupt { .. }));
    assert_eq!(
        fs::read_to_string(store.path())?,
        "{\"libraries\": {\"CityLib\": "
    );
    Ok(())
}

#[test]
fn test_lock_blocks_concurrent_configure() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, store) = setup_store()?;
    let _held = ConfigLock::acquire(store.path())?;

    let result = ConfigLock::acquire(store.path());
    assert!(matches!(result, Err(ConfigError::Locked { .. })));
    Ok(())
}

#[test]
fn test_backup_then_restore() -> Result<(), Box<dyn std::error::Error>> {
    let (temp_dir, store) = setup_store()?;
    let backups = ConfigBackupManager::new(temp_dir.path().join("backups")).with_max_backups(5);

    let mut doc = store.load()?;
    reconcile(&mut doc, &[LibraryRecord::new("A", "a", "1")]);
    store.save(&doc)?;
    let snapshot = backups.create_backup(&store.load()?)?;

    reconcile(&mut doc, &[LibraryRecord::new("A", "moved", "1")]);
    store.save(&doc)?;

    let restored = backups.restore_from_backup(&snapshot)?;
    store.save(&restored)?;
    let entry = store.load()?.library("A").ok_or("A missing")?;
    assert_eq!(entry.base_url().as_deref(), Some("a"));
    Ok(())
}

#[test]
fn test_settings_point_at_download_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = SettingsManager::with_directory(temp_dir.path().join("settings"));
    let config_path = temp_dir.path().join("odmpy").join("config.json");

    manager.save(&Settings {
        download_config_path: config_path.clone(),
        ..Settings::default()
    })?;
    let settings = manager.load()?;

    let store = ConfigStore::new(&settings.download_config_path);
    store.save(&store.load()?)?;
    assert!(config_path.exists());
    assert_eq!(settings.backup_dir(), temp_dir.path().join("odmpy").join("backups"));
    Ok(())
}

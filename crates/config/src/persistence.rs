//! File system persistence for the download tool configuration
//!
//! This module handles reading and writing the configuration file with:
//! - Atomic writes (temp file in the same directory, fsync, rename)
//! - Directory creation
//! - NO PANICS - all errors are handled via Result types

use crate::{ConfigDocument, ConfigError, ConfigResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Loads and saves a [`ConfigDocument`] at a fixed path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Creates a store for the given config file path
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Loads the configuration document
    ///
    /// A missing file is a first run and yields an empty document. An empty,
    /// unparseable or wrongly shaped file is corrupt and is never repaired.
    pub fn load(&self) -> ConfigResult<ConfigDocument> {
        if !self.config_path.exists() {
            log::info!(
                "Config file not found at {}, starting from an empty document",
                self.config_path.display()
            );
            return Ok(ConfigDocument::new());
        }

        let contents =
            fs::read_to_string(&self.config_path).map_err(|e| ConfigError::ReadError {
                path: self.config_path.clone(),
                source: e,
            })?;

        // Empty or whitespace-only files are corrupted, not defaults
        if contents.trim().is_empty() {
            return Err(ConfigError::Corrupt {
                path: self.config_path.clone(),
                reason: "file is empty or contains only whitespace".to_string(),
            });
        }

        let doc = ConfigDocument::from_json_str(&contents).map_err(|reason| ConfigError::Corrupt {
            path: self.config_path.clone(),
            reason,
        })?;

        log::debug!(
            "Loaded config with {} libraries from {}",
            doc.library_count(),
            self.config_path.display()
        );
        Ok(doc)
    }

    /// Saves the document atomically
    ///
    /// On any failure the previous file is left exactly as it was.
    pub fn save(&self, doc: &ConfigDocument) -> ConfigResult<()> {
        self.stage(doc)?.commit()?;
        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }

    /// Writes the serialized document to a temp file next to the target
    /// without touching the target itself
    pub fn stage(&self, doc: &ConfigDocument) -> ConfigResult<StagedWrite> {
        let contents = doc.to_json_string()?;
        StagedWrite::write(&self.config_path, &contents)
    }
}

/// A fully written temp file waiting to replace its target
///
/// Dropping it without [`StagedWrite::commit`] removes the temp file and leaves
/// the target untouched.
#[derive(Debug)]
pub struct StagedWrite {
    temp_file: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Creates the parent directory if needed, then writes and fsyncs
    /// `contents` into a temp file in the same directory as `target`
    pub fn write(target: &Path, contents: &str) -> ConfigResult<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_directory_exists(&dir)?;

        let mut temp_file = NamedTempFile::new_in(&dir).map_err(|e| ConfigError::WriteError {
            path: target.to_path_buf(),
            source: e,
        })?;

        let write_err = |e| ConfigError::WriteError {
            path: target.to_path_buf(),
            source: e,
        };
        temp_file.write_all(contents.as_bytes()).map_err(write_err)?;
        temp_file.flush().map_err(write_err)?;
        temp_file.as_file().sync_all().map_err(write_err)?;

        Ok(Self {
            temp_file,
            target: target.to_path_buf(),
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_file.path()
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically renames the temp file over the target
    pub fn commit(self) -> ConfigResult<()> {
        self.temp_file
            .persist(&self.target)
            .map_err(|e| ConfigError::WriteError {
                path: self.target.clone(),
                source: e.error,
            })?;

        Ok(())
    }
}

/// Ensures a directory exists, creating it if necessary
pub(crate) fn ensure_directory_exists(path: &Path) -> ConfigResult<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| ConfigError::DirectoryCreationError {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::info!("Created config directory: {}", path.display());
    }
    Ok(())
}

/// `config.json` + `lock` -> `config.json.lock`
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LibraryConfig;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        (temp_dir, config_path)
    }

    #[test]
    fn test_load_nonexistent_returns_empty_document() {
        let (_temp_dir, config_path) = setup_test_dir();
        let store = ConfigStore::new(config_path);

        let doc = store.load().expect("Should load empty document");
        assert_eq!(doc, ConfigDocument::new());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (_temp_dir, config_path) = setup_test_dir();
        let store = ConfigStore::new(config_path);

        let mut doc = ConfigDocument::new();
        doc.set("encode", json!({"format": "mp3", "bitrate": 64}));
        doc.insert_library("CityLib", LibraryConfig::new("city.example", "7").with_pin("1234"));

        store.save(&doc).expect("Should save config");
        let loaded = store.load().expect("Should load config");

        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_resave_is_byte_identical() {
        let (_temp_dir, config_path) = setup_test_dir();
        let store = ConfigStore::new(config_path.clone());

        let doc = ConfigDocument::from_json_str(
            r#"{"z": [1, 2.5, "x"], "libraries": {"A": {"pin": "1", "extra": {"k": null}}}, "a": false}"#,
        )
        .unwrap();
        store.save(&doc).expect("Should save");
        let first = fs::read(&config_path).unwrap();

        store.save(&store.load().unwrap()).expect("Should save again");
        let second = fs::read(&config_path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_save_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("subdir").join("config.json");
        let store = ConfigStore::new(config_path.clone());

        store
            .save(&ConfigDocument::new())
            .expect("Should create directory and save");

        assert!(config_path.exists());
    }

    #[test]
    fn test_overwrite_leaves_no_sibling_files() {
        let (temp_dir, config_path) = setup_test_dir();
        let store = ConfigStore::new(config_path);

        store.save(&ConfigDocument::new()).expect("Should save");
        store.save(&ConfigDocument::new()).expect("Should save again");

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["config.json"]);
    }

    #[test]
    fn test_invalid_config_returns_corrupt() {
        let (_temp_dir, config_path) = setup_test_dir();
        fs::write(&config_path, "this is not valid JSON {{{").expect("Should write file");

        let result = ConfigStore::new(config_path).load();
        assert!(matches!(result, Err(ConfigError::Corrupt { .. })));
    }

    #[test]
    fn test_empty_config_returns_corrupt() {
        let (_temp_dir, config_path) = setup_test_dir();
        fs::write(&config_path, "  \n").expect("Should write file");

        let result = ConfigStore::new(config_path).load();
        assert!(matches!(result, Err(ConfigError::Corrupt { .. })));
    }

    #[test]
    fn test_dropped_stage_leaves_target_untouched() {
        let (temp_dir, config_path) = setup_test_dir();
        fs::write(&config_path, "{\"libraries\": {}}\n").unwrap();
        let store = ConfigStore::new(config_path.clone());

        let mut doc = store.load().unwrap();
        doc.insert_library("New", LibraryConfig::new("u", "1"));
        let staged = store.stage(&doc).expect("Should stage");
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        assert!(temp_path.starts_with(temp_dir.path()));
        drop(staged);

        assert!(!temp_path.exists());
        assert_eq!(
            fs::read_to_string(&config_path).unwrap(),
            "{\"libraries\": {}}\n"
        );
    }

    #[test]
    fn test_sibling_with_suffix() {
        assert_eq!(
            sibling_with_suffix(Path::new("/a/config.json"), "lock"),
            PathBuf::from("/a/config.json.lock")
        );
    }
}

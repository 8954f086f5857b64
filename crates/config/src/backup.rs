//! Timestamped backups of the download tool configuration
//!
//! A backup is taken before every `configure` save that changes the
//! document, and old backups are rotated away.

use crate::persistence::{ensure_directory_exists, StagedWrite};
use crate::{ConfigDocument, ConfigError, ConfigResult};
use std::fs;
use std::path::{Path, PathBuf};

const BACKUP_PREFIX: &str = "config_";
const BACKUP_EXTENSION: &str = "json";

/// Manages configuration backups
pub struct ConfigBackupManager {
    backup_dir: PathBuf,
    max_backups: usize,
}

impl ConfigBackupManager {
    /// Creates a new backup manager
    ///
    /// Backups are stored in the specified directory.
    pub fn new(backup_dir: PathBuf) -> Self {
        Self {
            backup_dir,
            max_backups: 10,
        }
    }

    /// Sets the maximum number of backups to keep
    pub fn with_max_backups(mut self, max: usize) -> Self {
        self.max_backups = max;
        self
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Writes `doc` to a new timestamped backup file
    ///
    /// Returns the path to the backup file.
    pub fn create_backup(&self, doc: &ConfigDocument) -> ConfigResult<PathBuf> {
        ensure_directory_exists(&self.backup_dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let mut backup_path = self
            .backup_dir
            .join(format!("{}{}.{}", BACKUP_PREFIX, timestamp, BACKUP_EXTENSION));
        // Two backups within the same millisecond get a counter suffix
        let mut counter = 1;
        while backup_path.exists() {
            backup_path = self.backup_dir.join(format!(
                "{}{}_{}.{}",
                BACKUP_PREFIX, timestamp, counter, BACKUP_EXTENSION
            ));
            counter += 1;
        }

        StagedWrite::write(&backup_path, &doc.to_json_string()?)?.commit()?;
        log::info!("Created config backup at {}", backup_path.display());

        self.rotate_backups()?;

        Ok(backup_path)
    }

    /// Reads a backup back into a document
    ///
    /// The caller decides whether to save it over the live configuration.
    pub fn restore_from_backup(&self, backup_path: &Path) -> ConfigResult<ConfigDocument> {
        if !backup_path.exists() {
            return Err(ConfigError::PathResolutionError {
                reason: format!("Backup file not found: {}", backup_path.display()),
            });
        }

        let contents = fs::read_to_string(backup_path).map_err(|e| ConfigError::ReadError {
            path: backup_path.to_path_buf(),
            source: e,
        })?;

        let doc = ConfigDocument::from_json_str(&contents).map_err(|reason| {
            ConfigError::Corrupt {
                path: backup_path.to_path_buf(),
                reason,
            }
        })?;

        log::info!("Restored config from {}", backup_path.display());

        Ok(doc)
    }

    /// Resolves a bare backup filename against the backup directory
    pub fn resolve(&self, name: &str) -> PathBuf {
        let candidate = Path::new(name);
        if candidate.is_absolute() || candidate.components().count() > 1 {
            candidate.to_path_buf()
        } else {
            self.backup_dir.join(candidate)
        }
    }

    /// Lists all available backups, newest first
    pub fn list_backups(&self) -> ConfigResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|s| s.to_str()) != Some(BACKUP_EXTENSION)
            {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if !filename.starts_with(BACKUP_PREFIX) {
                continue;
            }

            let metadata = fs::metadata(&path)?;
            backups.push(BackupInfo {
                filename: filename.to_string(),
                path: path.clone(),
                modified: metadata.modified()?,
                size_bytes: metadata.len(),
            });
        }

        // Timestamped names sort chronologically
        backups.sort_by(|a, b| b.filename.cmp(&a.filename));

        Ok(backups)
    }

    /// Deletes a specific backup
    pub fn delete_backup(&self, backup_path: &Path) -> ConfigResult<()> {
        if !backup_path.starts_with(&self.backup_dir) {
            return Err(ConfigError::PathResolutionError {
                reason: "Backup path is not in the backup directory".to_string(),
            });
        }

        fs::remove_file(backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.to_path_buf(),
            source: e,
        })?;

        log::debug!("Deleted backup at {}", backup_path.display());

        Ok(())
    }

    /// Rotates backups, keeping only the most recent ones
    fn rotate_backups(&self) -> ConfigResult<()> {
        let backups = self.list_backups()?;

        if backups.len() > self.max_backups {
            let to_delete = &backups[self.max_backups..];
            for backup in to_delete {
                self.delete_backup(&backup.path)?;
            }
            log::info!("Rotated backups, deleted {} old backup(s)", to_delete.len());
        }

        Ok(())
    }
}

/// Information about a config backup
#[derive(Debug, Clone)]
pub struct BackupInfo {
    /// Full path to the backup file
    pub path: PathBuf,
    /// Filename of the backup
    pub filename: String,
    /// Last modification time
    pub modified: std::time::SystemTime,
    /// File size in bytes
    pub size_bytes: u64,
}

impl BackupInfo {
    /// Returns a human-readable local timestamp
    pub fn modified_timestamp(&self) -> String {
        chrono::DateTime::<chrono::Local>::from(self.modified)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// Returns file size in a human-readable format
    pub fn size_human(&self) -> String {
        let bytes = self.size_bytes as f64;
        if bytes < 1024.0 {
            format!("{} B", bytes)
        } else if bytes < 1024.0 * 1024.0 {
            format!("{:.1} KB", bytes / 1024.0)
        } else {
            format!("{:.1} MB", bytes / (1024.0 * 1024.0))
        }
    }
}

//! Advisory lock around a reconcile-and-save sequence
//!
//! The lock lives in a sibling `<config>.lock` file so the configuration file
//! itself can still be replaced by rename while the lock is held.

use crate::persistence::{ensure_directory_exists, sibling_with_suffix};
use crate::{ConfigError, ConfigResult};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive lock on one configuration path, released on drop
#[derive(Debug)]
pub struct ConfigLock {
    file: File,
    lock_path: PathBuf,
}

impl ConfigLock {
    /// Takes the lock without waiting
    ///
    /// Returns [`ConfigError::Locked`] when another process holds it.
    pub fn acquire(config_path: &Path) -> ConfigResult<Self> {
        let lock_path = Self::lock_path_for(config_path);
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_directory_exists(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| ConfigError::WriteError {
                path: lock_path.clone(),
                source: e,
            })?;

        if let Err(err) = fs2::FileExt::try_lock_exclusive(&file) {
            if err.kind() == fs2::lock_contended_error().kind() {
                return Err(ConfigError::Locked {
                    path: config_path.to_path_buf(),
                });
            }
            return Err(ConfigError::IoError(err));
        }

        log::debug!("Acquired config lock {}", lock_path.display());
        Ok(Self { file, lock_path })
    }

    pub fn lock_path_for(config_path: &Path) -> PathBuf {
        sibling_with_suffix(config_path, "lock")
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            log::warn!("Failed to release {}: {}", self.lock_path.display(), e);
        } else {
            log::debug!("Released config lock {}", self.lock_path.display());
        }
    }
}

//! Error types for the configuration system

use loanload_core::AppError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file exists but is not a usable document
    #[error("Config file at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Failed to parse the settings file
    #[error("Failed to parse settings file at {path}: {source}")]
    SettingsParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to write config file
    #[error("Failed to write config file at {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize the download tool configuration
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    SettingsSerializeError(#[from] toml::ser::Error),

    /// Settings contain invalid values
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Failed to create config directory
    #[error("Failed to create config directory at {path}: {source}")]
    DirectoryCreationError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config directory path could not be determined
    #[error("Could not determine config directory path: {reason}")]
    PathResolutionError { reason: String },

    /// Config file is locked by another process
    #[error("Config file {path} is locked by another process")]
    Locked { path: PathBuf },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Corrupt { path, reason } => AppError::ConfigCorrupt { path, reason },
            ConfigError::SettingsParseError { path, source } => AppError::ConfigCorrupt {
                path,
                reason: source.to_string(),
            },
            ConfigError::WriteError { path, source }
            | ConfigError::DirectoryCreationError { path, source } => {
                AppError::ConfigWriteError { path, source }
            }
            ConfigError::Locked { path } => AppError::ConfigLocked { path },
            ConfigError::ValidationError(reason) => AppError::InvalidConfiguration {
                setting: "settings".to_string(),
                value: String::new(),
                reason,
            },
            ConfigError::PathResolutionError { reason } => AppError::InvalidConfiguration {
                setting: "config_dir".to_string(),
                value: String::new(),
                reason,
            },
            ConfigError::ReadError { path, source } => {
                AppError::io(format!("Failed to read {}", path.display()), source)
            }
            ConfigError::IoError(source) => AppError::from(source),
            other @ (ConfigError::SerializeError(_) | ConfigError::SettingsSerializeError(_)) => {
                AppError::io(
                    other.to_string(),
                    std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
                )
            }
        }
    }
}

/// Validation error for a specific settings field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path to the field (e.g., "download_timeout_secs")
    pub field: String,

    /// Human-readable error message
    pub message: String,

    /// The invalid value, if available
    pub value: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Creates a validation error with the invalid value
    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: Some(value.to_string()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field '{}': {}", self.field, self.message)?;
        if let Some(ref value) = self.value {
            write!(f, " (got: {})", value)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("download_command", "must not be empty");
        assert_eq!(err.to_string(), "Field 'download_command': must not be empty");
    }

    #[test]
    fn test_validation_error_with_value() {
        let err = ValidationError::with_value(
            "download_timeout_secs",
            "must be between 1 and 86400",
            "0",
        );
        assert_eq!(
            err.to_string(),
            "Field 'download_timeout_secs': must be between 1 and 86400 (got: 0)"
        );
    }

    #[test]
    fn test_corrupt_maps_to_config_corrupt() {
        let err = ConfigError::Corrupt {
            path: PathBuf::from("/cfg/config.json"),
            reason: "trailing characters".to_string(),
        };
        assert!(matches!(AppError::from(err), AppError::ConfigCorrupt { .. }));
    }

    #[test]
    fn test_write_failure_maps_to_config_write_error() {
        let err = ConfigError::WriteError {
            path: PathBuf::from("/cfg/config.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "ro"),
        };
        assert!(matches!(
            AppError::from(err),
            AppError::ConfigWriteError { .. }
        ));
    }

    #[test]
    fn test_lock_maps_to_config_locked() {
        let err = ConfigError::Locked {
            path: PathBuf::from("/cfg/config.json"),
        };
        assert!(matches!(AppError::from(err), AppError::ConfigLocked { .. }));
    }
}

//! loanload's own settings file
//!
//! Not to be confused with the download tool's configuration: these settings
//! only tell loanload where things live and how to run the two external tools.

use crate::validation::{ConfigSection, ValidationError, Validator};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings file format version
pub const SETTINGS_VERSION: u32 = 1;

/// Final download root, the variable the download container already uses
pub const ENV_DOWNLOAD_ROOT: &str = "AUDIOBOOK_FOLDER";
pub const ENV_STAGING_ROOT: &str = "LOANLOAD_STAGING_ROOT";
pub const ENV_DOWNLOAD_CONFIG: &str = "LOANLOAD_DOWNLOAD_CONFIG";
pub const ENV_EXPORT_PATH: &str = "LOANLOAD_EXPORT_PATH";

/// Placeholder for the export file in `session_command`
pub const EXPORT_PLACEHOLDER: &str = "{export}";

/// Log level for application logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Settings file format version
    pub version: u32,

    /// Root the audiobook manager scans; loans land in `<root>/libby/<id>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_root: Option<PathBuf>,

    /// Root for in-progress downloads, defaults to `<download_root>/tmp`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_root: Option<PathBuf>,

    /// The download tool's configuration file
    pub download_config_path: PathBuf,

    /// Where the session tool writes its loan export
    pub export_path: PathBuf,

    /// Session tool invocation; `{export}` is replaced by `export_path`
    pub session_command: String,

    /// Download tool invocation, run once per loan
    pub download_command: String,

    /// A download still running after this long is killed
    pub download_timeout_secs: u64,

    /// Keep a timestamped backup before each configuration change
    pub backup_on_save: bool,

    /// Number of timestamped backups to keep
    pub max_backups: usize,

    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            download_root: None,
            staging_root: None,
            download_config_path: PathBuf::from("config/config.json"),
            export_path: PathBuf::from("/tmp/libby.json"),
            session_command: format!("odmpy libby --exportloans {}", EXPORT_PLACEHOLDER),
            download_command:
                "docker compose run --rm odmpy-ng -s={website_id} -i={loan_id} -n={staging_rel} -r"
                    .to_string(),
            download_timeout_secs: 30 * 60,
            backup_on_save: true,
            max_backups: 10,
            log_level: LogLevel::Info,
        }
    }
}

impl Settings {
    /// The session command with the export path filled in
    pub fn session_command_line(&self) -> String {
        self.session_command
            .replace(EXPORT_PLACEHOLDER, &self.export_path.display().to_string())
    }

    /// The configured download root, or an error naming the setting
    pub fn require_download_root(&self) -> ConfigResult<&Path> {
        self.download_root.as_deref().ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "download_root is not set; set it in the settings file or export {}",
                ENV_DOWNLOAD_ROOT
            ))
        })
    }

    /// Directory for timestamped backups of the download tool configuration
    pub fn backup_dir(&self) -> PathBuf {
        match self.download_config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join("backups"),
            _ => PathBuf::from("backups"),
        }
    }

    /// Applies overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`; empty values are ignored
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = get(ENV_DOWNLOAD_ROOT) {
            log::debug!("{} overrides download_root", ENV_DOWNLOAD_ROOT);
            self.download_root = Some(PathBuf::from(root));
        }
        if let Some(staging) = get(ENV_STAGING_ROOT) {
            self.staging_root = Some(PathBuf::from(staging));
        }
        if let Some(config) = get(ENV_DOWNLOAD_CONFIG) {
            self.download_config_path = PathBuf::from(config);
        }
        if let Some(export) = get(ENV_EXPORT_PATH) {
            self.export_path = PathBuf::from(export);
        }
    }
}

impl ConfigSection for Settings {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = Vec::new();

        if self.download_config_path.as_os_str().is_empty() {
            results.push(Err(ValidationError::new(
                "download_config_path",
                "must not be empty",
            )));
        }
        if self.export_path.as_os_str().is_empty() {
            results.push(Err(ValidationError::new("export_path", "must not be empty")));
        }

        results.push(Validator::not_empty(&self.session_command, "session_command"));
        results.push(Validator::not_empty(&self.download_command, "download_command"));
        results.push(Validator::has_placeholders(
            &self.download_command,
            &["{loan_id}"],
            "download_command",
        ));
        results.push(Validator::in_range(
            self.download_timeout_secs,
            1,
            24 * 60 * 60,
            "download_timeout_secs",
        ));
        results.push(Validator::in_range(self.max_backups, 1, 1000, "max_backups"));

        Validator::collect_errors(results)
    }

    fn section_name(&self) -> &'static str {
        "settings"
    }
}

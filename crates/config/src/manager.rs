//! Settings manager - main API for loanload's own settings file

use crate::persistence::StagedWrite;
use crate::validation::ConfigSection;
use crate::{ConfigError, ConfigResult, Settings};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.toml";

/// Main settings manager
///
/// Handles the settings file path, defaults, validation and environment
/// overrides.
pub struct SettingsManager {
    config_dir: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager using the default config directory
    ///
    /// The default directory follows the platform conventions:
    /// - Linux: `~/.config/loanload/`
    /// - macOS: `~/Library/Application Support/loanload/`
    /// - Windows: `%APPDATA%\loanload\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Ok(Self::with_directory(config_dir))
    }

    /// Creates a settings manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "loanload")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the full settings file path
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Loads the settings file
    ///
    /// A missing file yields defaults. A file that does not parse is an error.
    pub fn load(&self) -> ConfigResult<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        let settings: Settings =
            toml::from_str(&contents).map_err(|e| ConfigError::SettingsParseError {
                path: path.clone(),
                source: e,
            })?;

        if let Err(errors) = settings.validate() {
            let error_msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            log::warn!("Settings have validation warnings: {}", error_msg);
        }

        Ok(settings)
    }

    /// Loads the settings, falling back to defaults on any error
    pub fn load_or_default(&self) -> Settings {
        match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load settings: {}, using defaults", e);
                Settings::default()
            }
        }
    }

    /// Loads the settings file, then applies environment overrides
    pub fn load_with_env_overrides(&self) -> ConfigResult<Settings> {
        let mut settings = self.load()?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Validates and saves the settings atomically
    pub fn save(&self, settings: &Settings) -> ConfigResult<()> {
        if let Err(errors) = settings.validate() {
            let error_msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ConfigError::ValidationError(error_msg));
        }

        let contents = toml::to_string_pretty(settings)?;
        StagedWrite::write(&self.settings_path(), &contents)?.commit()?;

        log::info!("Settings saved to {}", self.settings_path().display());
        Ok(())
    }

    /// Writes a default settings file if one doesn't exist
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.settings_path().exists() {
            log::info!(
                "Settings file already exists at {}",
                self.settings_path().display()
            );
            return Ok(false);
        }

        self.save(&Settings::default())?;
        Ok(true)
    }

    /// Overwrites the settings file with defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Settings::default())
    }
}

//! Error types and recovery strategies for loanload
//!
//! Every failure of a configure or download run is classified into one of three tiers:
//! - **Recoverable**: handled locally, the run continues (a single malformed record)
//! - **Degraded**: this run cannot finish, but trying again later may work
//! - **Fatal**: the user has to act before anything else can happen
//!
//! Nothing here is retried automatically. Authentication failures in particular
//! need a human to re-enter a login code.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Skip the offending item and keep going
    SkipRecord,
    /// Run the command again later; no automatic retry
    RetryLater,
    /// Restore the configuration from a backup
    RestoreBackup,
    /// No automatic recovery - user intervention required
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkipRecord => write!(f, "Skipping record"),
            Self::RetryLater => write!(f, "Retry later"),
            Self::RestoreBackup => write!(f, "Restore from backup"),
            Self::UserIntervention => write!(f, "User intervention required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Recovered locally, the run continues
    Recoverable,
    /// The run aborts but nothing is damaged
    Degraded,
    /// The run aborts and needs user action
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type for loanload
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Session tool =====
    /// The session tool could not be invoked or returned malformed data
    #[error("Library source '{provider}' unavailable: {reason}")]
    SourceUnavailable { provider: String, reason: String },

    /// The session tool reports that the user is not (or no longer) logged in
    #[error("Authentication required by {provider}")]
    AuthenticationRequired { provider: String },

    /// A single library record is unusable (missing name)
    #[error("Malformed library record #{index}: {reason}")]
    RecordMalformed { index: usize, reason: String },

    // ===== Download tool configuration =====
    /// Existing configuration exists but cannot be parsed
    #[error("Configuration corrupted at {path}: {reason}")]
    ConfigCorrupt { path: PathBuf, reason: String },

    /// I/O failure while saving the configuration
    #[error("Failed to write configuration at {path}: {source}")]
    ConfigWriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another process holds the configuration lock
    #[error("Configuration at {path} is locked by another process")]
    ConfigLocked { path: PathBuf },

    // ===== Settings / downloads =====
    /// Invalid orchestrator setting
    #[error("Invalid configuration: {setting} = '{value}' ({reason})")]
    InvalidConfiguration {
        setting: String,
        value: String,
        reason: String,
    },

    /// The download tool failed for one loan
    #[error("Download of loan {loan_id} failed: {reason}")]
    DownloadFailed { loan_id: String, reason: String },

    /// General I/O error
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: io::Error,
    },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RecordMalformed { .. } => ErrorSeverity::Recoverable,

            Self::SourceUnavailable { .. }
            | Self::ConfigLocked { .. }
            | Self::DownloadFailed { .. }
            | Self::IoError { .. } => ErrorSeverity::Degraded,

            Self::AuthenticationRequired { .. }
            | Self::ConfigCorrupt { .. }
            | Self::ConfigWriteError { .. }
            | Self::InvalidConfiguration { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::RecordMalformed { .. } => RecoveryAction::SkipRecord,

            Self::SourceUnavailable { .. }
            | Self::ConfigLocked { .. }
            | Self::DownloadFailed { .. } => RecoveryAction::RetryLater,

            Self::ConfigCorrupt { .. } => RecoveryAction::RestoreBackup,

            // Default to user intervention for safety
            _ => RecoveryAction::UserIntervention,
        }
    }

    /// Returns an actionable message suitable for printing to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceUnavailable { provider, .. } => format!(
                "Could not read your libraries from {}. Check that it is installed and try again.",
                provider
            ),
            Self::AuthenticationRequired { provider } => format!(
                "You are not logged in. Run the login step of {} again, then re-run this command.",
                provider
            ),
            Self::RecordMalformed { index, .. } => {
                format!("Library entry #{} has no name and was skipped.", index)
            }
            Self::ConfigCorrupt { path, .. } => format!(
                "The download configuration at {} cannot be read. Fix it by hand or restore a backup; it was left untouched.",
                path.display()
            ),
            Self::ConfigWriteError { path, .. } => format!(
                "Could not save the download configuration at {}. The previous file is unchanged.",
                path.display()
            ),
            Self::ConfigLocked { .. } => {
                "Another loanload run is updating the configuration. Wait for it to finish."
                    .to_string()
            }
            Self::InvalidConfiguration { setting, .. } => {
                format!("Invalid setting: {}. Please check your settings file.", setting)
            }
            Self::DownloadFailed { loan_id, .. } => format!(
                "Loan {} did not download. Its log was saved next to the partial files.",
                loan_id
            ),
            Self::IoError { .. } => "A file operation failed. Please try again.".to_string(),
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Returns true if the run may continue after this error
    pub fn is_locally_recoverable(&self) -> bool {
        self.recovery_action() == RecoveryAction::SkipRecord
    }

    /// Helper to create a source error
    pub fn source_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Helper to wrap an I/O error with a message
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            message: message.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

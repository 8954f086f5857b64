//! loanload configuration
//!
//! Two files are managed here:
//!
//! - the **download tool's configuration**, a JSON document shared with a human
//!   editor. [`ConfigStore`] loads and atomically saves it, and [`reconcile`]
//!   merges discovered libraries into it without touching anything the user
//!   owns.
//! - loanload's own **settings**, a TOML file handled by [`SettingsManager`].
//!
//! # Example
//!
//! ```rust,no_run
//! use loanload_config::{reconcile, ConfigLock, ConfigStore};
//! use loanload_core::LibraryRecord;
//!
//! # fn main() -> Result<(), loanload_config::ConfigError> {
//! let store = ConfigStore::new("config/config.json");
//! let _lock = ConfigLock::acquire(store.path())?;
//!
//! let mut doc = store.load()?;
//! let report = reconcile(&mut doc, &[LibraryRecord::new("CityLib", "https://city.example", "12")]);
//! if report.changed() {
//!     store.save(&doc)?;
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

pub mod backup;
pub mod document;
pub mod lock;
pub mod reconcile;
pub mod settings;

pub use backup::{BackupInfo, ConfigBackupManager};
pub use document::{ConfigDocument, LibraryConfig};
pub use error::{ConfigError, ConfigResult, ValidationError};
pub use lock::ConfigLock;
pub use manager::SettingsManager;
pub use persistence::{ConfigStore, StagedWrite};
pub use reconcile::{reconcile, reconciled, ReconcileReport};
pub use settings::{LogLevel, Settings, SETTINGS_VERSION};
pub use validation::{ConfigSection, Validator};

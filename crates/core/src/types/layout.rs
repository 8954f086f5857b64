use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory under every root that holds loans fetched by loanload
pub const LIBBY_DIR: &str = "libby";

/// Where one loan is assembled and where it ends up
///
/// Derived from `(download_root, staging_root, loan_id)`; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanLayout {
    /// In-progress directory the download tool writes into
    pub staging_path: PathBuf,
    /// Final directory the audiobook manager scans
    pub final_path: PathBuf,
}

impl LoanLayout {
    pub fn new(staging_path: PathBuf, final_path: PathBuf) -> Self {
        Self {
            staging_path,
            final_path,
        }
    }

    /// True once the loan has been promoted into the final root
    pub fn is_complete(&self) -> bool {
        self.final_path.is_dir()
    }
}

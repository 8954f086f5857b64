//! Where a loan is staged and where it ends up

use loanload_core::{LoanLayout, LIBBY_DIR};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Staging directory under the download root when none is configured
pub const DEFAULT_STAGING_DIR: &str = "tmp";

/// Derives a [`LoanLayout`] for a loan; no I/O, the loan id is used verbatim
pub fn plan(download_root: &Path, staging_root: &Path, loan_id: &str) -> LoanLayout {
    LoanLayout::new(
        staging_root.join(LIBBY_DIR).join(loan_id),
        download_root.join(LIBBY_DIR).join(loan_id),
    )
}

/// Plans layouts against a fixed pair of roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlanner {
    download_root: PathBuf,
    staging_root: PathBuf,
}

impl LayoutPlanner {
    /// Staging defaults to `<download_root>/tmp`
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        let download_root = download_root.into();
        let staging_root = download_root.join(DEFAULT_STAGING_DIR);
        Self {
            download_root,
            staging_root,
        }
    }

    pub fn with_staging_root(mut self, staging_root: impl Into<PathBuf>) -> Self {
        self.staging_root = staging_root.into();
        self
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// `<download_root>/libby`, the directory the audiobook manager scans
    pub fn libby_root(&self) -> PathBuf {
        self.download_root.join(LIBBY_DIR)
    }

    pub fn plan(&self, loan_id: &str) -> LoanLayout {
        plan(&self.download_root, &self.staging_root, loan_id)
    }

    /// Creates the final `libby` directory if it is missing
    ///
    /// Returns true when it had to be created.
    pub fn ensure_libby_root(&self) -> io::Result<bool> {
        let root = self.libby_root();
        if root.is_dir() {
            return Ok(false);
        }
        log::warn!(
            "Download directory {} does not exist, creating it",
            root.display()
        );
        fs::create_dir_all(&root)?;
        Ok(true)
    }
}

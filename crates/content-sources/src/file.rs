use crate::session::read_export;
use crate::{LibrarySource, SessionExport, SourceMetadata, SourceResult};
use std::path::{Path, PathBuf};

/// An export the session tool already wrote, read without running the tool
#[derive(Debug, Clone)]
pub struct ExportFileSource {
    path: PathBuf,
}

impl ExportFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LibrarySource for ExportFileSource {
    fn fetch_export(&self) -> SourceResult<SessionExport> {
        log::info!("Reading session export from {}", self.path.display());
        read_export(&self.path)
    }

    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "export file".to_string(),
            description: format!("Session tool export at {}", self.path.display()),
            requires_auth: false,
        }
    }
}

use crate::{LibrarySource, SessionExport, SourceMetadata, SourceResult};
use loanload_core::{LibraryRecord, Loan};

/// Records held in memory, for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    export: SessionExport,
}

impl StaticSource {
    pub fn new(libraries: Vec<LibraryRecord>, loans: Vec<Loan>) -> Self {
        Self {
            export: SessionExport { libraries, loans },
        }
    }
}

impl LibrarySource for StaticSource {
    fn fetch_export(&self) -> SourceResult<SessionExport> {
        Ok(self.export.clone())
    }

    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "static".to_string(),
            description: format!("{} libraries held in memory", self.export.libraries.len()),
            requires_auth: false,
        }
    }
}

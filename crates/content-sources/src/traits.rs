use crate::{SessionExport, SourceResult};
use loanload_core::{LibraryRecord, Loan};

/// A provider of the user's library accounts and loans
pub trait LibrarySource {
    /// Reads one complete export
    fn fetch_export(&self) -> SourceResult<SessionExport>;

    /// Library records in the order the source reports them
    fn fetch_records(&self) -> SourceResult<Vec<LibraryRecord>> {
        Ok(self.fetch_export()?.libraries)
    }

    /// Every loan across all libraries
    fn fetch_loans(&self) -> SourceResult<Vec<Loan>> {
        Ok(self.fetch_export()?.loans)
    }

    /// Get metadata about the source
    fn metadata(&self) -> SourceMetadata;
}

/// Source metadata
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    pub name: String,
    pub description: String,
    /// Whether reading this source may require the user to log in
    pub requires_auth: bool,
}

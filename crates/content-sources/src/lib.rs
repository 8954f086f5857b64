//! Library record sources
//!
//! Everything loanload knows about the user's library accounts and loans comes
//! from the session tool's export. The sources here either run the session
//! tool, read an export it already wrote, or serve records from memory.

mod export;
mod file;
mod session;
mod static_source;
mod traits;

pub use export::SessionExport;
pub use file::ExportFileSource;
pub use session::{SessionToolSource, AUTH_HINTS};
pub use static_source::StaticSource;
pub use traits::{LibrarySource, SourceMetadata};

use loanload_core::AppError;
use std::fmt;

/// Result type for library source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors from library sources
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The session tool could not be run or its export could not be read
    Unavailable(String),
    /// The session tool needs the user to log in again
    AuthenticationRequired(String),
    /// The export is not in a shape we understand
    ParseError(String),
}

impl SourceError {
    /// Converts into the application error, naming the tool that failed
    pub fn into_app_error(self, provider: &str) -> AppError {
        match self {
            SourceError::AuthenticationRequired(_) => AppError::AuthenticationRequired {
                provider: provider.to_string(),
            },
            SourceError::Unavailable(reason) => AppError::source_unavailable(provider, reason),
            SourceError::ParseError(reason) => AppError::source_unavailable(
                provider,
                format!("malformed export: {}", reason),
            ),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unavailable(e) => write!(f, "Source unavailable: {}", e),
            SourceError::AuthenticationRequired(e) => write!(f, "Authentication required: {}", e),
            SourceError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        err.into_app_error("session tool")
    }
}

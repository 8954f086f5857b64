use loanload_core::AppError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Failed to start download tool: {0}")]
    ToolStart(#[source] std::io::Error),

    #[error("Failed to move {from} to {to}: {source}")]
    Promotion {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid metadata file {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type LibraryResult<T> = std::result::Result<T, LibraryError>;

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::ToolStart(source) => {
                AppError::io("Failed to start download tool", source)
            }
            LibraryError::Promotion { from, to, source } => AppError::io(
                format!("Failed to move {} to {}", from.display(), to.display()),
                source,
            ),
            LibraryError::Io(source) => AppError::from(source),
            other => AppError::io(
                other.to_string(),
                std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
            ),
        }
    }
}

//! Shared types and the error taxonomy for loanload
//!
//! Every other crate in the workspace speaks in terms of the records, loans
//! and layouts defined here, and surfaces failures as [`AppError`].

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use types::{
    deserialize_lenient_text, deserialize_opaque_id, LibraryRecord, Loan, LoanLayout, LIBBY_DIR,
};

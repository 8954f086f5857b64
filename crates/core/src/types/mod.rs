//! Domain types for loanload
//!
//! - `record`: library accounts reported by the session tool
//! - `loan`: checked-out audiobooks
//! - `layout`: where a loan lives on disk
//! - `common`: shared serde helpers

mod common;
mod layout;
mod loan;
mod record;

pub use common::{deserialize_lenient_text, deserialize_opaque_id};
pub use layout::{LoanLayout, LIBBY_DIR};
pub use loan::Loan;
pub use record::LibraryRecord;

//! Download-side orchestration for loanload
//!
//! Plans where each loan is staged and where it finally lives, drives the
//! download tool one loan at a time, tracks progress across attempts, and
//! promotes finished downloads into the directory the audiobook manager scans.

pub mod error;
pub mod fetch;
pub mod layout;
pub mod metadata;
pub mod progress;
pub mod promote;
pub mod tool;

pub use error::{LibraryError, LibraryResult};
pub use fetch::{FetchOutcome, FetchRunner, FetchSummary};
pub use layout::{plan, LayoutPlanner};
pub use metadata::{tag_provenance, METADATA_FILE, PROVENANCE_TAG};
pub use progress::{ProgressCheck, StagingProgress};
pub use promote::{promote, Promotion};
pub use tool::{CommandDownloadTool, DownloadOutcome, DownloadTool};

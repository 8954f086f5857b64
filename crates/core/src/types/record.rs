use crate::error::AppError;
use crate::types::common::{deserialize_lenient_text, deserialize_opaque_id};
use serde::{Deserialize, Serialize};

/// One lending-service library account the user has access to
///
/// Every field defaults to empty so that a partially filled record from the
/// session tool still deserializes; a blank `name` makes the record malformed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryRecord {
    /// Human-readable identifier, unique within a run
    #[serde(alias = "library_name", deserialize_with = "deserialize_lenient_text")]
    pub name: String,

    /// The library's lending-service endpoint
    #[serde(alias = "baseUrl", deserialize_with = "deserialize_lenient_text")]
    pub base_url: String,

    /// Opaque identifier the download tool addresses the library by
    #[serde(alias = "websiteId", deserialize_with = "deserialize_opaque_id")]
    pub website_id: String,
}

impl LibraryRecord {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        website_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            website_id: website_id.into(),
        }
    }

    /// A record without a usable name cannot be keyed into the configuration
    pub fn is_malformed(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// Checks the record, `index` being its position in the source's output
    pub fn validate(&self, index: usize) -> Result<(), AppError> {
        if self.is_malformed() {
            return Err(AppError::RecordMalformed {
                index,
                reason: format!("missing name (website_id '{}')", self.website_id),
            });
        }
        Ok(())
    }
}

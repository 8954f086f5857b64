use crate::types::common::{deserialize_lenient_text, deserialize_opaque_id};
use serde::{Deserialize, Serialize};

/// A single checked-out audiobook
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Loan {
    /// Service-assigned identifier, assumed filesystem-safe
    #[serde(deserialize_with = "deserialize_opaque_id")]
    pub id: String,

    #[serde(deserialize_with = "deserialize_lenient_text")]
    pub title: String,

    /// Website identifier of the library the loan came from
    #[serde(alias = "websiteId", deserialize_with = "deserialize_opaque_id")]
    pub website_id: String,

    /// Library name, when the export reports it
    #[serde(alias = "libraryName", skip_serializing_if = "Option::is_none")]
    pub library_name: Option<String>,
}

impl Loan {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        website_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            website_id: website_id.into(),
            library_name: None,
        }
    }

    pub fn with_library(mut self, library_name: impl Into<String>) -> Self {
        self.library_name = Some(library_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_session_tool_shape() {
        let loan: Loan = serde_json::from_str(
            r#"{"id": "9921", "title": "Dune", "websiteId": 77, "cardId": "x"}"#,
        )
        .unwrap();
        assert_eq!(loan, Loan::new("9921", "Dune", "77"));
    }

    #[test]
    fn test_missing_fields_default() {
        let loan: Loan = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        assert_eq!(loan.id, "5");
        assert!(loan.title.is_empty());
        assert!(loan.website_id.is_empty());
        assert_eq!(loan.library_name, None);
    }
}

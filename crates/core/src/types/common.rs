//! Serde helpers shared across domain models

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// Accepts an identifier written as a string, an integer, or null.
///
/// The session tool is not consistent about quoting numeric identifiers, and
/// downstream consumers only ever treat them as opaque tokens. Null becomes the
/// empty string.
pub fn deserialize_opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OpaqueId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Option::<OpaqueId>::deserialize(deserializer)? {
        Some(OpaqueId::Text(s)) => s,
        Some(OpaqueId::Unsigned(n)) => n.to_string(),
        Some(OpaqueId::Signed(n)) => n.to_string(),
        None => String::new(),
    })
}

/// Accepts any JSON value for a free-text field
///
/// Strings are kept, numbers and booleans are rendered as text, and null,
/// arrays or objects become the empty string. A record with an unusable field
/// then still deserializes and is judged by its own validation.
pub fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Flag(bool),
        Other(IgnoredAny),
    }

    Ok(match Text::deserialize(deserializer)? {
        Text::Text(s) => s,
        Text::Unsigned(n) => n.to_string(),
        Text::Signed(n) => n.to_string(),
        Text::Float(n) => n.to_string(),
        Text::Flag(b) => b.to_string(),
        Text::Other(_) => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "deserialize_opaque_id")]
        id: String,
    }

    fn parse(json: &str) -> String {
        serde_json::from_str::<Holder>(json).unwrap().id
    }

    #[test]
    fn test_accepts_strings_and_numbers() {
        assert_eq!(parse(r#"{"id": "abc"}"#), "abc");
        assert_eq!(parse(r#"{"id": 42}"#), "42");
        assert_eq!(parse(r#"{"id": -7}"#), "-7");
    }

    #[test]
    fn test_null_is_empty() {
        assert_eq!(parse(r#"{"id": null}"#), "");
    }

    #[test]
    fn test_rejects_objects() {
        assert!(serde_json::from_str::<Holder>(r#"{"id": {"x": 1}}"#).is_err());
    }

    #[derive(Deserialize)]
    struct Named {
        #[serde(default, deserialize_with = "deserialize_lenient_text")]
        name: String,
    }

    fn parse_name(json: &str) -> String {
        serde_json::from_str::<Named>(json).unwrap().name
    }

    #[test]
    fn test_lenient_text_never_fails() {
        assert_eq!(parse_name(r#"{"name": "CityLib"}"#), "CityLib");
        assert_eq!(parse_name(r#"{"name": 7}"#), "7");
        assert_eq!(parse_name(r#"{"name": null}"#), "");
        assert_eq!(parse_name(r#"{"name": ["a"]}"#), "");
        assert_eq!(parse_name(r#"{"name": {"first": "City"}}"#), "");
        assert_eq!(parse_name(r#"{}"#), "");
    }
}

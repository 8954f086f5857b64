//! The download tool's configuration as an ordered, mostly opaque document
//!
//! Only three fields per library have a typed meaning here: `base_url` and
//! `website_id`, which loanload discovers and owns, and `pin`, which belongs to
//! the user and is only ever read. Everything else, top-level or per-library,
//! is carried through as an opaque JSON value in its original position.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Top-level key holding the per-library mapping
pub const LIBRARIES_KEY: &str = "libraries";
/// Per-library endpoint, owned by the reconciler
pub const BASE_URL_KEY: &str = "base_url";
/// Per-library website identifier, owned by the reconciler
pub const WEBSITE_ID_KEY: &str = "website_id";
/// Per-library login pin, owned by the user
pub const PIN_KEY: &str = "pin";

/// One library's entry inside [`ConfigDocument`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryConfig {
    fields: Map<String, Value>,
}

impl LibraryConfig {
    /// A fresh entry with the pin left as the unset placeholder (`null`)
    pub fn new(base_url: impl Into<String>, website_id: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(BASE_URL_KEY.to_string(), Value::String(base_url.into()));
        fields.insert(WEBSITE_ID_KEY.to_string(), Value::String(website_id.into()));
        fields.insert(PIN_KEY.to_string(), Value::Null);
        Self { fields }
    }

    /// Wraps an existing JSON object; anything else is rejected
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Sets an arbitrary field, keeping its position if it already exists
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn base_url(&self) -> Option<String> {
        self.fields.get(BASE_URL_KEY).and_then(value_as_token)
    }

    pub fn website_id(&self) -> Option<String> {
        self.fields.get(WEBSITE_ID_KEY).and_then(value_as_token)
    }

    /// The user's pin, `None` while it is still the unset placeholder
    pub fn pin(&self) -> Option<String> {
        self.fields
            .get(PIN_KEY)
            .and_then(value_as_token)
            .filter(|pin| !pin.is_empty())
    }

    pub fn has_pin(&self) -> bool {
        self.pin().is_some()
    }

    /// Returns true when the stored value actually changed
    pub fn set_base_url(&mut self, base_url: &str) -> bool {
        self.replace_string(BASE_URL_KEY, base_url)
    }

    /// Returns true when the stored value actually changed
    pub fn set_website_id(&mut self, website_id: &str) -> bool {
        self.replace_string(WEBSITE_ID_KEY, website_id)
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.fields
            .insert(PIN_KEY.to_string(), Value::String(pin.into()));
        self
    }

    fn replace_string(&mut self, key: &str, value: &str) -> bool {
        if self.fields.get(key).and_then(Value::as_str) == Some(value) {
            return false;
        }
        self.fields
            .insert(key.to_string(), Value::String(value.to_string()));
        true
    }
}

/// Renders scalar identifiers the way a user would type them
fn value_as_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The download tool's full configuration
///
/// Equality is semantic: two documents with the same keys and values compare
/// equal whatever their key order, and whether or not the `libraries` key was
/// present in the file they were read from.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    /// Top-level entries; `libraries` is held as a `null` placeholder so its
    /// position survives a round trip
    root: Map<String, Value>,
    /// Library name to entry; every value is a JSON object
    libraries: Map<String, Value>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigDocument {
    /// An empty but valid document with an empty `libraries` mapping
    pub fn new() -> Self {
        let mut root = Map::new();
        root.insert(LIBRARIES_KEY.to_string(), Value::Null);
        Self {
            root,
            libraries: Map::new(),
        }
    }

    /// Builds a document from parsed JSON, checking its shape
    ///
    /// The root must be an object; `libraries`, when present, must be an
    /// object whose values are all objects.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let mut root = match value {
            Value::Object(root) => root,
            other => {
                return Err(format!(
                    "expected a JSON object at the top level, found {}",
                    kind(&other)
                ))
            }
        };

        let libraries = match root.get_mut(LIBRARIES_KEY) {
            None => Map::new(),
            Some(slot) => match std::mem::take(slot) {
                Value::Object(map) => map,
                other => {
                    return Err(format!(
                        "'{}' must be an object, found {}",
                        LIBRARIES_KEY,
                        kind(&other)
                    ))
                }
            },
        };

        if let Some((name, entry)) = libraries.iter().find(|(_, entry)| !entry.is_object()) {
            return Err(format!(
                "library '{}' must be an object, found {}",
                name,
                kind(entry)
            ));
        }

        Ok(Self { root, libraries })
    }

    pub fn from_json_str(contents: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(contents).map_err(|e| e.to_string())?;
        Self::from_value(value)
    }

    /// The whole document as JSON, `libraries` back in its original position
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        for (key, value) in &self.root {
            if key == LIBRARIES_KEY {
                out.insert(key.clone(), Value::Object(self.libraries.clone()));
            } else {
                out.insert(key.clone(), value.clone());
            }
        }
        if !self.root.contains_key(LIBRARIES_KEY) && !self.libraries.is_empty() {
            out.insert(
                LIBRARIES_KEY.to_string(),
                Value::Object(self.libraries.clone()),
            );
        }
        Value::Object(out)
    }

    /// Pretty JSON with a trailing newline; deterministic for a given document
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        let mut contents = serde_json::to_string_pretty(&self.to_value())?;
        contents.push('\n');
        Ok(contents)
    }

    /// A top-level value not owned by the reconciler
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == LIBRARIES_KEY {
            return None;
        }
        self.root.get(key)
    }

    /// Sets a top-level value; `libraries` can only be changed through the
    /// library accessors
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if key == LIBRARIES_KEY {
            return false;
        }
        self.root.insert(key, value);
        true
    }

    pub fn library_names(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }

    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    pub fn contains_library(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    pub fn library(&self, name: &str) -> Option<LibraryConfig> {
        self.libraries
            .get(name)
            .cloned()
            .and_then(LibraryConfig::from_value)
    }

    /// Inserts or replaces an entry, keeping its position when it exists
    pub fn insert_library(&mut self, name: impl Into<String>, entry: LibraryConfig) {
        self.libraries.insert(name.into(), entry.into_value());
    }

    /// Applies `f` to an existing entry in place
    ///
    /// Returns `None` when no library of that name exists.
    pub fn update_library<F, R>(&mut self, name: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut LibraryConfig) -> R,
    {
        let slot = self.libraries.get_mut(name)?;
        let mut entry = LibraryConfig::from_value(std::mem::take(slot)).unwrap_or_default();
        let result = f(&mut entry);
        *slot = entry.into_value();
        Some(result)
    }

    /// Libraries whose pin is still the unset placeholder
    pub fn libraries_missing_pin(&self) -> Vec<String> {
        self.libraries
            .iter()
            .filter(|(_, entry)| {
                entry
                    .get(PIN_KEY)
                    .and_then(value_as_token)
                    .is_none_or(|pin| pin.is_empty())
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl PartialEq for ConfigDocument {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl Serialize for ConfigDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConfigDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_document_has_empty_libraries() {
        let doc = ConfigDocument::new();
        assert_eq!(doc.library_count(), 0);
        assert_eq!(doc.to_value(), json!({"libraries": {}}));
    }

    #[test]
    fn test_key_order_is_preserved() {
        let contents = r#"{"zeta": 1, "libraries": {"B": {"pin": "1"}, "A": {}}, "alpha": true}"#;
        let doc = ConfigDocument::from_json_str(contents).unwrap();
        let keys: Vec<_> = doc
            .to_value()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["zeta", "libraries", "alpha"]);
        assert_eq!(doc.library_names().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn test_missing_libraries_key_is_only_written_when_needed() {
        let mut doc = ConfigDocument::from_json_str(r#"{"encode": "mp3"}"#).unwrap();
        assert_eq!(doc.to_value(), json!({"encode": "mp3"}));

        doc.insert_library("CityLib", LibraryConfig::new("u", "1"));
        let value = doc.to_value();
        assert_eq!(value["libraries"]["CityLib"]["website_id"], "1");
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(ConfigDocument::from_json_str("[1, 2]").is_err());
        assert!(ConfigDocument::from_json_str(r#"{"libraries": []}"#).is_err());
        assert!(ConfigDocument::from_json_str(r#"{"libraries": {"A": "x"}}"#).is_err());
        assert!(ConfigDocument::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_new_library_has_unset_pin() {
        let entry = LibraryConfig::new("https://city.example", "12");
        assert_eq!(entry.get(PIN_KEY), Some(&Value::Null));
        assert!(!entry.has_pin());
        assert_eq!(entry.base_url().as_deref(), Some("https://city.example"));
    }

    #[test]
    fn test_numeric_website_id_reads_as_token() {
        let doc =
            ConfigDocument::from_json_str(r#"{"libraries": {"A": {"website_id": 42, "pin": 1234}}}"#)
                .unwrap();
        let entry = doc.library("A").unwrap();
        assert_eq!(entry.website_id().as_deref(), Some("42"));
        assert_eq!(entry.pin().as_deref(), Some("1234"));
    }

    #[test]
    fn test_setters_report_change() {
        let mut entry = LibraryConfig::new("u", "1");
        assert!(!entry.set_base_url("u"));
        assert!(entry.set_website_id("2"));
        assert!(!entry.set_website_id("2"));
    }

    #[test]
    fn test_update_library_keeps_other_fields_and_position() {
        let mut doc = ConfigDocument::from_json_str(
            r#"{"libraries": {"A": {"pin": "9", "base_url": "old", "format": "mp3"}, "B": {}}}"#,
        )
        .unwrap();
        let changed = doc
            .update_library("A", |entry| entry.set_base_url("new"))
            .unwrap();
        assert!(changed);

        let entry = doc.library("A").unwrap();
        let keys: Vec<_> = entry.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["pin", "base_url", "format"]);
        assert_eq!(entry.pin().as_deref(), Some("9"));
        assert_eq!(doc.library_names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(doc.update_library("missing", |_| ()).is_none());
    }

    #[test]
    fn test_libraries_key_is_not_reachable_through_generic_accessors() {
        let mut doc = ConfigDocument::new();
        assert!(doc.get(LIBRARIES_KEY).is_none());
        assert!(!doc.set(LIBRARIES_KEY, json!([])));
        assert!(doc.set("encode", json!({"bitrate": 64})));
        assert_eq!(doc.get("encode"), Some(&json!({"bitrate": 64})));
    }

    #[test]
    fn test_libraries_missing_pin() {
        let doc = ConfigDocument::from_json_str(
            r#"{"libraries": {"A": {"pin": null}, "B": {"pin": "1"}, "C": {"pin": ""}, "D": {}}}"#,
        )
        .unwrap();
        assert_eq!(doc.libraries_missing_pin(), vec!["A", "C", "D"]);
    }

    #[test]
    fn test_equality_ignores_key_order() {
        let a = ConfigDocument::from_json_str(r#"{"x": 1, "libraries": {}}"#).unwrap();
        let b = ConfigDocument::from_json_str(r#"{"libraries": {}, "x": 1}"#).unwrap();
        assert_eq!(a, b);
    }
}

//! Field Store: ordered mapping from field name to (optional) string value.
//!
//! Insertion order is the order fields were first discovered during extraction and is never
//! re-sorted; updating a value keeps the field where it is.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldStore {
    entries: IndexMap<String, Option<String>>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field. Existing fields keep their position; new ones are appended.
    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        self.entries.insert(name.into(), value);
    }

    /// Present only when the field exists and is non-null.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Builds a store from an extracted JSON object, normalizing every value to display text.
    pub fn from_json_object(obj: &serde_json::Map<String, Value>) -> Self {
        obj.iter()
            .map(|(k, v)| (k.clone(), normalize_value(v)))
            .collect()
    }
}

impl FromIterator<(String, Option<String>)> for FieldStore {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let obj = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        Ok(FieldStore::from_json_object(&obj))
    }
}

/// Converts an extracted JSON value to the string form kept in the store.
/// Objects and arrays become 2-space pretty JSON; `null` stays absent.
pub fn normalize_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            Some(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
        }
        other => Some(other.to_string()),
    }
}

/// Immutable copy of the Field Store taken at upload time (the read-only reference column).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSnapshot(Arc<FieldStore>);

impl ExtractedSnapshot {
    pub fn capture(store: &FieldStore) -> Self {
        Self(Arc::new(store.clone()))
    }

    pub fn fields(&self) -> &FieldStore {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name)
    }

    /// True when `current` differs from the extracted value of `name`.
    pub fn is_edited(&self, name: &str, current: &FieldStore) -> bool {
        self.0.get(name) != current.get(name)
    }
}

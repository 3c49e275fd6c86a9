//! The flexible key-value payload stored per item.
//!
//! A [`Document`] maps field names to scalar [`DocValue`]s. Keys are a
//! convention (they should match the category's field names) and are not
//! enforced: stale and missing keys are both legal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::models::{Field, FieldType};

/// A scalar document value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl DocValue {
    /// Coerce raw form input into a value for a field of the given type.
    ///
    /// Numbers that do not parse stay strings; empty input is the empty string.
    pub fn coerce(field_type: &FieldType, raw: &str) -> Self {
        match field_type {
            FieldType::Number => {
                let trimmed = raw.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Self::Number(i.into());
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Self::Number)
                    .unwrap_or_else(|| Self::String(raw.to_string()))
            }
            FieldType::Boolean => match raw.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Self::Bool(true),
                "false" | "no" | "0" | "off" | "" => Self::Bool(false),
                _ => Self::String(raw.to_string()),
            },
            _ => Self::String(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value, rejecting arrays and objects.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(b) => Ok(Self::Bool(*b)),
            JsonValue::Number(n) => Ok(Self::Number(n.clone())),
            JsonValue::String(s) => Ok(Self::String(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => Err(Error::InvalidInput(
                "document values must be strings, numbers, booleans or null".to_string(),
            )),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => JsonValue::Number(n.clone()),
            Self::String(s) => JsonValue::String(s.clone()),
        }
    }
}

impl std::fmt::Display for DocValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DocValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for DocValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for DocValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for DocValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// Field-name to value mapping stored per item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, DocValue>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DocValue>) -> Option<DocValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Move the value under `old` to `new`.
    ///
    /// Returns `false` and leaves the document untouched when `old` is absent
    /// or equal to `new`. An existing value under `new` is overwritten.
    pub fn rename_key(&mut self, old: &str, new: &str) -> bool {
        if old == new {
            return false;
        }
        match self.0.remove(old) {
            Some(value) => {
                self.0.insert(new.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove_key(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    /// Decode a JSON object of scalars.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            Error::InvalidInput("document must be a JSON object".to_string())
        })?;
        let mut doc = Self::new();
        for (key, v) in obj {
            doc.0.insert(key.clone(), DocValue::from_json(v)?);
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Build a document from raw `(key, value)` pairs, coercing each value
    /// by the type of the field with the same name. Keys with no field are
    /// stored as strings.
    pub fn from_raw_pairs<'a, I>(pairs: I, fields: &[Field]) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut doc = Self::new();
        for (key, raw) in pairs {
            let value = match fields.iter().find(|f| f.name == key) {
                Some(field) => DocValue::coerce(&field.field_type, raw),
                None => DocValue::String(raw.to_string()),
            };
            doc.0.insert(key.to_string(), value);
        }
        doc
    }

    /// Compare the document's keys to a category's field definitions.
    pub fn conformance(&self, fields: &[Field]) -> Conformance {
        let stale_keys = self
            .keys()
            .filter(|k| !fields.iter().any(|f| f.name == *k))
            .map(String::from)
            .collect();
        let missing_fields = fields
            .iter()
            .filter(|f| !self.contains_key(&f.name))
            .map(|f| f.name.clone())
            .collect();
        Conformance {
            stale_keys,
            missing_fields,
        }
    }
}

impl<K: Into<String>, V: Into<DocValue>> FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// How a document's keys line up with its category's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conformance {
    /// Keys with no field of that name.
    pub stale_keys: Vec<String>,
    /// Fields with no key in the document.
    pub missing_fields: Vec<String>,
}

impl Conformance {
    pub fn is_exact(&self) -> bool {
        self.stale_keys.is_empty() && self.missing_fields.is_empty()
    }
}

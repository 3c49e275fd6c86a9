//! Core data models for mediatrack.
//!
//! These types are shared across all mediatrack crates and represent
//! the core domain entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::document::Document;

// =============================================================================
// IDENTITY
// =============================================================================

/// A registered user. Owns categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at_utc: DateTime<Utc>,
}

/// The acting identity for a request.
///
/// Every catalog and migration call takes a principal explicitly; nothing
/// resolves the current user from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

impl Principal {
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }

    /// Whether this principal owns a resource with the given owner id.
    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.username.clone())
    }
}

// =============================================================================
// CATEGORY TYPES
// =============================================================================

/// A user-defined grouping of items sharing a field schema ("Books", "Podcasts").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Request for creating a category.
#[derive(Debug, Clone, Default)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Falls back to [`defaults::CATEGORY_DESCRIPTION`] when omitted.
    pub description: Option<String>,
}

impl CreateCategoryRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description to store, applying the default.
    pub fn description_or_default(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| defaults::CATEGORY_DESCRIPTION.to_string())
    }
}

/// Request for updating a category. A missing description keeps the old one.
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

// =============================================================================
// FIELD TYPES
// =============================================================================

/// Type tag of a field definition.
///
/// Unknown tags read back from storage are kept verbatim in [`FieldType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
    Select,
    Notes,
    Boolean,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::Select => "Select",
            Self::Notes => "Notes",
            Self::Boolean => "Boolean",
            Self::Other(tag) => tag,
        }
    }

    /// Parse a stored tag. Matching is case-insensitive; anything else is `Other`.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "text" => Self::Text,
            "number" => Self::Number,
            "date" => Self::Date,
            "select" => Self::Select,
            "notes" => Self::Notes,
            "boolean" | "bool" => Self::Boolean,
            _ => Self::Other(tag.trim().to_string()),
        }
    }

    /// Whether an option list means anything for this type.
    pub fn uses_options(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("Field type must not be empty".to_string());
        }
        Ok(Self::parse(s))
    }
}

impl Serialize for FieldType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}

/// A named, typed schema element attached to a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Allowed values, only meaningful for [`FieldType::Select`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Request for creating a field definition.
#[derive(Debug, Clone, Default)]
pub struct CreateFieldRequest {
    pub name: String,
    pub field_type: FieldType,
    pub options: Option<Vec<String>>,
}

impl CreateFieldRequest {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            options: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }
}

/// Full replacement of a field's attributes.
///
/// `options` replaces the stored list wholesale; `None` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateFieldRequest {
    pub name: String,
    pub field_type: FieldType,
    pub options: Option<Vec<String>>,
}

/// Parse a comma separated option list ("Read, Reading , Unread").
///
/// Entries are trimmed and empty entries dropped.
pub fn parse_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// =============================================================================
// ITEM TYPES
// =============================================================================

/// A single record within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub category_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
    pub data: Document,
}

// =============================================================================
// MIGRATION RESULTS
// =============================================================================

/// Outcome of a field rename or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// The field after the change (or as it was, for a delete).
    pub field: Field,
    /// Items listed in the category.
    pub items_scanned: usize,
    /// Items whose document carried the affected key.
    pub items_needing_migration: usize,
    /// Items whose document was rewritten and saved.
    pub items_migrated: usize,
}

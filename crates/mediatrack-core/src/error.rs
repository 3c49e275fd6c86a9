//! Error types for mediatrack.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using mediatrack's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mediatrack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Category not found, or not owned by the acting principal
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    /// Field not found, or its category is not owned by the acting principal
    #[error("Field not found: {0}")]
    FieldNotFound(Uuid),

    /// Item not found, or its category is not owned by the acting principal
    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    /// One or more item documents could not be migrated.
    ///
    /// The field definition was left unchanged. Re-running the same
    /// operation is safe: already migrated items no longer carry the old key.
    #[error(
        "Partial migration of field {field_id}: {migrated}/{total} items migrated, {} failed: {reason}",
        .failed.len()
    )]
    PartialMigration {
        field_id: Uuid,
        migrated: usize,
        total: usize,
        failed: Vec<Uuid>,
        reason: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::PartialMigration { .. } | Error::Database(_))
    }

    /// Whether this is any of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::CategoryNotFound(_)
                | Error::FieldNotFound(_)
                | Error::ItemNotFound(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

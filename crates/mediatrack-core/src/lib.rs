//! # mediatrack-core
//!
//! Core types, traits, and the schema migration engine for mediatrack.
//!
//! Items in a category store their values in a flexible [`Document`] keyed
//! by field name. When a field is renamed or deleted, [`SchemaMigrator`]
//! rewrites the documents of every sibling item so keys keep matching the
//! category's field definitions. Storage is reached through the traits in
//! [`traits`]; `mediatrack-db` implements them over PostgreSQL and
//! [`memory::MemoryStore`] implements them in process.

pub mod catalog;
pub mod defaults;
pub mod document;
pub mod error;
pub mod memory;
pub mod migration;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use catalog::Catalog;
pub use document::{Conformance, DocValue, Document};
pub use error::{Error, Result};
pub use migration::{KeyChange, SchemaMigrator};
pub use models::*;
pub use traits::*;

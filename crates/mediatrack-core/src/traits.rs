//! Core traits for mediatrack abstractions.
//!
//! These are the collaborator interfaces the migration engine and the
//! catalog service consume. `mediatrack-db` implements them over PostgreSQL
//! and [`crate::memory::MemoryStore`] implements them in process.

use async_trait::async_trait;
use uuid::Uuid;

use crate::document::Document;
use crate::error::Result;
use crate::models::*;

// =============================================================================
// MIGRATION COLLABORATORS
// =============================================================================

/// Read/write access to item documents keyed by category.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ids of every item belonging to a category. Documents are not decoded.
    async fn list_item_ids(&self, category_id: Uuid) -> Result<Vec<Uuid>>;

    /// Fetch the current document of an item, `None` if the item is gone.
    async fn get_item_document(&self, item_id: Uuid) -> Result<Option<Document>>;

    /// Replace the document of an item.
    ///
    /// Returns [`crate::Error::ItemNotFound`] when the item does not exist.
    async fn save_item_document(&self, item_id: Uuid, data: &Document) -> Result<()>;
}

/// CRUD over field definitions.
#[async_trait]
pub trait FieldRegistry: Send + Sync {
    /// Insert a new field definition into a category.
    async fn create_field(&self, category_id: Uuid, req: CreateFieldRequest) -> Result<Field>;

    /// Fetch a field by ID.
    async fn get_field(&self, id: Uuid) -> Result<Option<Field>>;

    /// List a category's fields in creation order.
    async fn list_fields(&self, category_id: Uuid) -> Result<Vec<Field>>;

    /// Persist name, type and options of an existing field.
    async fn save_field(&self, field: &Field) -> Result<()>;

    /// Remove a field definition.
    async fn delete_field(&self, id: Uuid) -> Result<()>;
}

/// Resolves who owns a category.
#[async_trait]
pub trait OwnershipResolver: Send + Sync {
    /// Owner user id of a category, `None` if the category does not exist.
    async fn category_owner(&self, category_id: Uuid) -> Result<Option<Uuid>>;
}

// =============================================================================
// CATALOG REPOSITORIES
// =============================================================================

/// Repository for category CRUD operations.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a new category owned by `owner_id`.
    async fn create_category(&self, owner_id: Uuid, req: CreateCategoryRequest) -> Result<Category>;

    /// Fetch a category by ID regardless of owner.
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>>;

    /// List an owner's categories ordered by name.
    async fn list_categories(&self, owner_id: Uuid) -> Result<Vec<Category>>;

    /// Persist name and description.
    async fn update_category(&self, category: &Category) -> Result<()>;

    /// Delete a category together with its fields and items.
    async fn delete_category(&self, id: Uuid) -> Result<()>;
}

/// Repository for item CRUD operations.
#[async_trait]
pub trait ItemRepository: DocumentStore {
    /// Insert a new item into a category.
    async fn create_item(&self, category_id: Uuid, data: Document) -> Result<Item>;

    /// Fetch an item by ID.
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>>;

    /// List a category's items, newest first.
    async fn list_items_by_category(&self, category_id: Uuid) -> Result<Vec<Item>>;

    /// Delete an item.
    async fn delete_item(&self, id: Uuid) -> Result<()>;
}

/// Repository for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Register a username. Fails with `Conflict` if it is taken.
    async fn create_user(&self, username: &str) -> Result<User>;

    /// Fetch a user by ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Look a user up by username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
}

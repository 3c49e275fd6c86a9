//! In-process backend implementing every repository trait.
//!
//! Useful for tests and for embedding the engine without PostgreSQL.
//! Cloning a [`MemoryStore`] shares the same underlying state.
//!
//! ```rust
//! use std::sync::Arc;
//! use mediatrack_core::memory::MemoryStore;
//! use mediatrack_core::SchemaMigrator;
//!
//! let store = Arc::new(MemoryStore::new());
//! let migrator = SchemaMigrator::new(store.clone(), store.clone(), store);
//! # let _ = migrator;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::*;

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    // UUIDv7 keys keep creation order.
    fields: BTreeMap<Uuid, Field>,
    items: BTreeMap<Uuid, Item>,
}

/// Shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, username: &str) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == username) {
            return Err(Error::Conflict(format!(
                "username '{}' already registered",
                username
            )));
        }
        let user = User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            created_at_utc: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create_category(&self, owner_id: Uuid, req: CreateCategoryRequest) -> Result<Category> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&owner_id) {
            return Err(Error::NotFound(format!("user {}", owner_id)));
        }
        let category = Category {
            id: Uuid::now_v7(),
            owner_id,
            description: req.description_or_default(),
            name: req.name,
            created_at_utc: Utc::now(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self, owner_id: Uuid) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state
            .categories
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let mut state = self.state.write().await;
        let existing = state
            .categories
            .get_mut(&category.id)
            .ok_or(Error::CategoryNotFound(category.id))?;
        existing.name = category.name.clone();
        existing.description = category.description.clone();
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Err(Error::CategoryNotFound(id));
        }
        state.fields.retain(|_, f| f.category_id != id);
        state.items.retain(|_, i| i.category_id != id);
        Ok(())
    }
}

#[async_trait]
impl OwnershipResolver for MemoryStore {
    async fn category_owner(&self, category_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .state
            .read()
            .await
            .categories
            .get(&category_id)
            .map(|c| c.owner_id))
    }
}

#[async_trait]
impl FieldRegistry for MemoryStore {
    async fn create_field(&self, category_id: Uuid, req: CreateFieldRequest) -> Result<Field> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&category_id) {
            return Err(Error::CategoryNotFound(category_id));
        }
        let field = Field {
            id: Uuid::now_v7(),
            category_id,
            name: req.name,
            field_type: req.field_type,
            options: req.options,
        };
        state.fields.insert(field.id, field.clone());
        Ok(field)
    }

    async fn get_field(&self, id: Uuid) -> Result<Option<Field>> {
        Ok(self.state.read().await.fields.get(&id).cloned())
    }

    async fn list_fields(&self, category_id: Uuid) -> Result<Vec<Field>> {
        Ok(self
            .state
            .read()
            .await
            .fields
            .values()
            .filter(|f| f.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn save_field(&self, field: &Field) -> Result<()> {
        let mut state = self.state.write().await;
        let existing = state
            .fields
            .get_mut(&field.id)
            .ok_or(Error::FieldNotFound(field.id))?;
        existing.name = field.name.clone();
        existing.field_type = field.field_type.clone();
        existing.options = field.options.clone();
        Ok(())
    }

    async fn delete_field(&self, id: Uuid) -> Result<()> {
        match self.state.write().await.fields.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::FieldNotFound(id)),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_item_ids(&self, category_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .values()
            .rev()
            .filter(|i| i.category_id == category_id)
            .map(|i| i.id)
            .collect())
    }

    async fn get_item_document(&self, item_id: Uuid) -> Result<Option<Document>> {
        Ok(self
            .state
            .read()
            .await
            .items
            .get(&item_id)
            .map(|i| i.data.clone()))
    }

    async fn save_item_document(&self, item_id: Uuid, data: &Document) -> Result<()> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(Error::ItemNotFound(item_id))?;
        item.data = data.clone();
        Ok(())
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn create_item(&self, category_id: Uuid, data: Document) -> Result<Item> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&category_id) {
            return Err(Error::CategoryNotFound(category_id));
        }
        let item = Item {
            id: Uuid::now_v7(),
            category_id,
            created_at_utc: Utc::now(),
            data,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn list_items_by_category(&self, category_id: Uuid) -> Result<Vec<Item>> {
        let state = self.state.read().await;
        // Newest first, matching the PostgreSQL ordering.
        Ok(state
            .items
            .values()
            .rev()
            .filter(|i| i.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn delete_item(&self, id: Uuid) -> Result<()> {
        match self.state.write().await.items.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::ItemNotFound(id)),
        }
    }
}

//! Catalog service: owner-scoped CRUD over users, categories, fields and items.
//!
//! Field renames and deletes are not handled here; they go through
//! [`crate::SchemaMigrator`] so item documents follow the schema.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{Conformance, Document};
use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::{CategoryRepository, FieldRegistry, ItemRepository, UserRepository};
use crate::validation::{validate_description, validate_name, validate_username};

/// Owner-scoped access to the catalog.
///
/// Every call takes the acting [`Principal`]. Resources owned by someone
/// else are reported with the same not-found error as missing ones.
#[derive(Clone)]
pub struct Catalog {
    users: Arc<dyn UserRepository>,
    categories: Arc<dyn CategoryRepository>,
    fields: Arc<dyn FieldRegistry>,
    items: Arc<dyn ItemRepository>,
}

impl Catalog {
    pub fn new(
        users: Arc<dyn UserRepository>,
        categories: Arc<dyn CategoryRepository>,
        fields: Arc<dyn FieldRegistry>,
        items: Arc<dyn ItemRepository>,
    ) -> Self {
        Self {
            users,
            categories,
            fields,
            items,
        }
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    pub async fn register_user(&self, username: &str) -> Result<User> {
        let username = validate_username(username)?;
        let user = self.users.create_user(&username).await?;
        info!(
            subsystem = "catalog",
            op = "register_user",
            user_id = %user.id,
            "User registered"
        );
        Ok(user)
    }

    /// Resolve a username to a principal.
    pub async fn principal(&self, username: &str) -> Result<Principal> {
        self.users
            .find_user_by_username(username.trim())
            .await?
            .map(|u| Principal::from(&u))
            .ok_or_else(|| Error::NotFound(format!("user '{}'", username.trim())))
    }

    /// Resolve a username, registering it first if needed.
    pub async fn ensure_principal(&self, username: &str) -> Result<Principal> {
        match self.principal(username).await {
            Ok(p) => Ok(p),
            Err(Error::NotFound(_)) => Ok(Principal::from(&self.register_user(username).await?)),
            Err(e) => Err(e),
        }
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    pub async fn create_category(
        &self,
        principal: &Principal,
        req: CreateCategoryRequest,
    ) -> Result<Category> {
        let name = validate_name(&req.name, "category name")?;
        let description = req
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        let category = self
            .categories
            .create_category(principal.user_id, CreateCategoryRequest { name, description })
            .await?;
        info!(
            subsystem = "catalog",
            op = "create_category",
            user_id = %principal.user_id,
            category_id = %category.id,
            "Category created"
        );
        Ok(category)
    }

    pub async fn list_categories(&self, principal: &Principal) -> Result<Vec<Category>> {
        self.categories.list_categories(principal.user_id).await
    }

    pub async fn get_category(&self, principal: &Principal, id: Uuid) -> Result<Category> {
        match self.categories.get_category(id).await? {
            Some(c) if principal.owns(c.owner_id) => Ok(c),
            Some(_) => {
                debug!(
                    subsystem = "catalog",
                    user_id = %principal.user_id,
                    category_id = %id,
                    "Category not owned by principal"
                );
                Err(Error::CategoryNotFound(id))
            }
            None => Err(Error::CategoryNotFound(id)),
        }
    }

    /// Rename a category. An omitted description keeps the current one.
    pub async fn update_category(
        &self,
        principal: &Principal,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> Result<Category> {
        let name = validate_name(&req.name, "category name")?;
        let mut category = self.get_category(principal, id).await?;
        category.name = name;
        if let Some(description) = req.description {
            category.description = validate_description(&description)?;
        }
        self.categories.update_category(&category).await?;
        Ok(category)
    }

    /// Delete a category with all of its fields and items.
    pub async fn delete_category(&self, principal: &Principal, id: Uuid) -> Result<()> {
        self.get_category(principal, id).await?;
        self.categories.delete_category(id).await?;
        info!(
            subsystem = "catalog",
            op = "delete_category",
            user_id = %principal.user_id,
            category_id = %id,
            "Category deleted"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Fields
    // -------------------------------------------------------------------------

    pub async fn list_fields(&self, principal: &Principal, category_id: Uuid) -> Result<Vec<Field>> {
        self.get_category(principal, category_id).await?;
        self.fields.list_fields(category_id).await
    }

    pub async fn get_field(&self, principal: &Principal, id: Uuid) -> Result<Field> {
        let field = self
            .fields
            .get_field(id)
            .await?
            .ok_or(Error::FieldNotFound(id))?;
        match self.get_category(principal, field.category_id).await {
            Ok(_) => Ok(field),
            Err(Error::CategoryNotFound(_)) => Err(Error::FieldNotFound(id)),
            Err(e) => Err(e),
        }
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    pub async fn create_item(
        &self,
        principal: &Principal,
        category_id: Uuid,
        data: Document,
    ) -> Result<Item> {
        self.get_category(principal, category_id).await?;
        let item = self.items.create_item(category_id, data).await?;
        debug!(
            subsystem = "catalog",
            op = "create_item",
            category_id = %category_id,
            item_id = %item.id,
            "Item created"
        );
        Ok(item)
    }

    /// Items of a category, newest first.
    pub async fn list_items(&self, principal: &Principal, category_id: Uuid) -> Result<Vec<Item>> {
        self.get_category(principal, category_id).await?;
        self.items.list_items_by_category(category_id).await
    }

    pub async fn get_item(&self, principal: &Principal, id: Uuid) -> Result<Item> {
        let item = self.items.get_item(id).await?.ok_or(Error::ItemNotFound(id))?;
        match self.get_category(principal, item.category_id).await {
            Ok(_) => Ok(item),
            Err(Error::CategoryNotFound(_)) => Err(Error::ItemNotFound(id)),
            Err(e) => Err(e),
        }
    }

    /// Replace an item's document.
    pub async fn replace_item_document(
        &self,
        principal: &Principal,
        id: Uuid,
        data: Document,
    ) -> Result<Item> {
        let mut item = self.get_item(principal, id).await?;
        self.items.save_item_document(id, &data).await?;
        item.data = data;
        Ok(item)
    }

    /// Merge raw `KEY=VALUE` style input into an item's document, coercing
    /// values by the category's field types.
    pub async fn set_item_values(
        &self,
        principal: &Principal,
        id: Uuid,
        pairs: &[(String, String)],
    ) -> Result<Item> {
        let item = self.get_item(principal, id).await?;
        let fields = self.fields.list_fields(item.category_id).await?;
        let updates =
            Document::from_raw_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())), &fields);
        let mut data = item.data;
        for (key, value) in updates.iter() {
            data.insert(key, value.clone());
        }
        self.replace_item_document(principal, id, data).await
    }

    /// Build a new document from raw input for a category.
    pub async fn coerce_document(
        &self,
        principal: &Principal,
        category_id: Uuid,
        pairs: &[(String, String)],
    ) -> Result<Document> {
        let fields = self.list_fields(principal, category_id).await?;
        Ok(Document::from_raw_pairs(
            pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            &fields,
        ))
    }

    pub async fn delete_item(&self, principal: &Principal, id: Uuid) -> Result<()> {
        self.get_item(principal, id).await?;
        self.items.delete_item(id).await
    }

    /// Compare an item's document keys to its category's fields.
    pub async fn item_conformance(&self, principal: &Principal, id: Uuid) -> Result<Conformance> {
        let item = self.get_item(principal, id).await?;
        let fields = self.fields.list_fields(item.category_id).await?;
        Ok(item.data.conformance(&fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocValue;
    use crate::memory::MemoryStore;

    async fn setup() -> (Catalog, Arc<MemoryStore>, Principal) {
        let store = Arc::new(MemoryStore::new());
        let catalog = Catalog::new(store.clone(), store.clone(), store.clone(), store.clone());
        let principal = catalog.ensure_principal("ahmad@example.com").await.unwrap();
        (catalog, store, principal)
    }

    #[tokio::test]
    async fn test_ensure_principal_is_stable() {
        let (catalog, _, principal) = setup().await;
        let again = catalog.ensure_principal("ahmad@example.com").await.unwrap();
        assert_eq!(again, principal);
        assert!(catalog.principal("nobody").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_category_crud() {
        let (catalog, _, principal) = setup().await;
        let books = catalog
            .create_category(&principal, CreateCategoryRequest::new("  Books "))
            .await
            .unwrap();
        assert_eq!(books.name, "Books");
        assert_eq!(books.description, "No description.");

        catalog
            .create_category(&principal, CreateCategoryRequest::new("Articles"))
            .await
            .unwrap();
        let names: Vec<String> = catalog
            .list_categories(&principal)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Articles", "Books"]);

        let updated = catalog
            .update_category(
                &principal,
                books.id,
                UpdateCategoryRequest {
                    name: "Library".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Library");
        assert_eq!(updated.description, "No description.");

        catalog.delete_category(&principal, books.id).await.unwrap();
        assert!(matches!(
            catalog.get_category(&principal, books.id).await,
            Err(Error::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_category_name_rejected() {
        let (catalog, _, principal) = setup().await;
        let err = catalog
            .create_category(&principal, CreateCategoryRequest::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_foreign_resources_are_not_found() {
        let (catalog, store, principal) = setup().await;
        let books = catalog
            .create_category(&principal, CreateCategoryRequest::new("Books"))
            .await
            .unwrap();
        let field = store
            .create_field(books.id, CreateFieldRequest::new("Title", FieldType::Text))
            .await
            .unwrap();
        let item = catalog
            .create_item(&principal, books.id, Document::new())
            .await
            .unwrap();

        let other = catalog.ensure_principal("someone-else").await.unwrap();
        assert!(catalog.list_categories(&other).await.unwrap().is_empty());
        assert!(matches!(
            catalog.get_category(&other, books.id).await,
            Err(Error::CategoryNotFound(_))
        ));
        assert!(matches!(
            catalog.get_field(&other, field.id).await,
            Err(Error::FieldNotFound(_))
        ));
        assert!(matches!(
            catalog.get_item(&other, item.id).await,
            Err(Error::ItemNotFound(_))
        ));
        assert!(catalog.delete_item(&other, item.id).await.is_err());
        assert!(catalog.get_item(&principal, item.id).await.is_ok());
    }

    /// Category repository whose lookups fail as if the store were down.
    struct UnreachableCategories;

    #[async_trait::async_trait]
    impl CategoryRepository for UnreachableCategories {
        async fn create_category(&self, _: Uuid, _: CreateCategoryRequest) -> Result<Category> {
            Err(Error::Internal("connection reset".to_string()))
        }

        async fn get_category(&self, _: Uuid) -> Result<Option<Category>> {
            Err(Error::Internal("connection reset".to_string()))
        }

        async fn list_categories(&self, _: Uuid) -> Result<Vec<Category>> {
            Err(Error::Internal("connection reset".to_string()))
        }

        async fn update_category(&self, _: &Category) -> Result<()> {
            Err(Error::Internal("connection reset".to_string()))
        }

        async fn delete_category(&self, _: Uuid) -> Result<()> {
            Err(Error::Internal("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_faults_are_not_reported_as_not_found() {
        let (catalog, store, principal) = setup().await;
        let books = catalog
            .create_category(&principal, CreateCategoryRequest::new("Books"))
            .await
            .unwrap();
        let field = store
            .create_field(books.id, CreateFieldRequest::new("Title", FieldType::Text))
            .await
            .unwrap();
        let item = store.create_item(books.id, Document::new()).await.unwrap();

        let broken = Catalog::new(
            store.clone(),
            Arc::new(UnreachableCategories),
            store.clone(),
            store.clone(),
        );
        let err = broken.get_field(&principal, field.id).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)), "got {:?}", err);
        let err = broken.get_item(&principal, item.id).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)), "got {:?}", err);
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_set_item_values_coerces_and_merges() {
        let (catalog, store, principal) = setup().await;
        let books = catalog
            .create_category(&principal, CreateCategoryRequest::new("Books"))
            .await
            .unwrap();
        store
            .create_field(books.id, CreateFieldRequest::new("Page Count", FieldType::Number))
            .await
            .unwrap();
        let doc: Document = [("Title", "Dune")].into_iter().collect();
        let item = catalog.create_item(&principal, books.id, doc).await.unwrap();

        let pairs = vec![("Page Count".to_string(), "412".to_string())];
        let updated = catalog
            .set_item_values(&principal, item.id, &pairs)
            .await
            .unwrap();
        assert_eq!(updated.data.get("Page Count"), Some(&DocValue::from(412i64)));
        assert_eq!(updated.data.get("Title"), Some(&DocValue::from("Dune")));

        let stored = catalog.get_item(&principal, item.id).await.unwrap();
        assert_eq!(stored.data, updated.data);
    }

    #[tokio::test]
    async fn test_list_items_newest_first() {
        let (catalog, _, principal) = setup().await;
        let books = catalog
            .create_category(&principal, CreateCategoryRequest::new("Books"))
            .await
            .unwrap();
        let first = catalog
            .create_item(&principal, books.id, Document::new())
            .await
            .unwrap();
        let second = catalog
            .create_item(&principal, books.id, Document::new())
            .await
            .unwrap();
        let ids: Vec<Uuid> = catalog
            .list_items(&principal, books.id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_item_conformance() {
        let (catalog, store, principal) = setup().await;
        let books = catalog
            .create_category(&principal, CreateCategoryRequest::new("Books"))
            .await
            .unwrap();
        store
            .create_field(books.id, CreateFieldRequest::new("Title", FieldType::Text))
            .await
            .unwrap();
        let doc: Document = [("Author", "James Clear")].into_iter().collect();
        let item = catalog.create_item(&principal, books.id, doc).await.unwrap();

        let report = catalog.item_conformance(&principal, item.id).await.unwrap();
        assert_eq!(report.stale_keys, vec!["Author"]);
        assert_eq!(report.missing_fields, vec!["Title"]);
    }
}

//! Schema migration engine.
//!
//! Keeps item documents consistent with field definition changes within one
//! category. A rename moves the old key to the new key in every sibling item
//! that has it; a delete removes the key. Items are processed one at a time
//! and there is no transaction across items: when a write fails the other
//! items are still attempted, the field definition is left untouched and the
//! caller gets [`Error::PartialMigration`]. Re-running the operation is safe
//! because migrated items no longer carry the old key.
//!
//! Two concurrent migrations of the same field are not serialized against
//! each other; the outcome of such a race is unspecified.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::models::{
    CreateFieldRequest, Field, FieldType, MigrationReport, Principal, UpdateFieldRequest,
};
use crate::traits::{DocumentStore, FieldRegistry, OwnershipResolver};
use crate::validation::validate_name;

/// Key transformation applied to each document of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyChange {
    Rename { from: String, to: String },
    Remove(String),
}

impl KeyChange {
    /// Apply to a document, returning whether it changed.
    pub fn apply(&self, doc: &mut Document) -> bool {
        match self {
            KeyChange::Rename { from, to } => doc.rename_key(from, to),
            KeyChange::Remove(key) => doc.remove_key(key),
        }
    }

    fn op(&self) -> &'static str {
        match self {
            KeyChange::Rename { .. } => "rename_field",
            KeyChange::Remove(_) => "delete_field",
        }
    }
}

/// Options are kept only for types that use them.
fn options_for(field_type: &FieldType, options: Option<Vec<String>>) -> Option<Vec<String>> {
    options.filter(|_| field_type.uses_options())
}

#[derive(Debug, Default)]
struct Sweep {
    scanned: usize,
    needing: usize,
    migrated: usize,
}

/// Applies field renames and deletes across a category's item documents.
#[derive(Clone)]
pub struct SchemaMigrator {
    documents: Arc<dyn DocumentStore>,
    fields: Arc<dyn FieldRegistry>,
    owners: Arc<dyn OwnershipResolver>,
}

impl SchemaMigrator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        fields: Arc<dyn FieldRegistry>,
        owners: Arc<dyn OwnershipResolver>,
    ) -> Self {
        Self {
            documents,
            fields,
            owners,
        }
    }

    /// Add a field to a category. No documents are touched.
    ///
    /// Names are unique within a category at creation time.
    pub async fn create_field(
        &self,
        principal: &Principal,
        category_id: Uuid,
        req: CreateFieldRequest,
    ) -> Result<Field> {
        let name = validate_name(&req.name, "field name")?;
        self.authorize_category(principal, category_id).await?;

        let siblings = self.fields.list_fields(category_id).await?;
        if siblings.iter().any(|f| f.name == name) {
            return Err(Error::Conflict(format!(
                "field '{}' already exists in category {}",
                name, category_id
            )));
        }

        let field = self
            .fields
            .create_field(
                category_id,
                CreateFieldRequest {
                    name,
                    options: options_for(&req.field_type, req.options),
                    field_type: req.field_type,
                },
            )
            .await?;

        info!(
            subsystem = "migration",
            component = "schema_migrator",
            op = "create_field",
            user_id = %principal.user_id,
            category_id = %category_id,
            field_id = %field.id,
            "Field created"
        );
        Ok(field)
    }

    /// Change type and options without renaming. No documents are touched.
    pub async fn update_field_metadata(
        &self,
        principal: &Principal,
        field_id: Uuid,
        field_type: FieldType,
        options: Option<Vec<String>>,
    ) -> Result<Field> {
        let mut field = self.authorized_field(principal, field_id).await?;
        field.options = options_for(&field_type, options);
        field.field_type = field_type;
        self.fields.save_field(&field).await?;

        info!(
            subsystem = "migration",
            component = "schema_migrator",
            op = "update_field_metadata",
            user_id = %principal.user_id,
            field_id = %field_id,
            "Field metadata updated"
        );
        Ok(field)
    }

    /// Update a field's name, type and options, relabeling the key in every
    /// item of its category when the name changes.
    ///
    /// Renaming onto a key some items already carry overwrites their value
    /// under that key (last write wins).
    pub async fn rename_field(
        &self,
        principal: &Principal,
        field_id: Uuid,
        req: UpdateFieldRequest,
    ) -> Result<MigrationReport> {
        let start = Instant::now();
        let new_name = validate_name(&req.name, "field name")?;
        let mut field = self.authorized_field(principal, field_id).await?;
        let old_name = field.name.clone();

        let sweep = if old_name == new_name {
            debug!(
                subsystem = "migration",
                component = "schema_migrator",
                op = "rename_field",
                field_id = %field_id,
                old_name = %old_name,
                "Name unchanged, skipping document migration"
            );
            Sweep::default()
        } else {
            let siblings = self.fields.list_fields(field.category_id).await?;
            if siblings
                .iter()
                .any(|f| f.id != field.id && f.name == new_name)
            {
                warn!(
                    subsystem = "migration",
                    component = "schema_migrator",
                    op = "rename_field",
                    field_id = %field_id,
                    old_name = %old_name,
                    new_name = %new_name,
                    "Another field already uses the new name; existing values under it will be overwritten"
                );
            }
            let change = KeyChange::Rename {
                from: old_name.clone(),
                to: new_name.clone(),
            };
            self.sweep(&field, &change).await?
        };

        field.name = new_name;
        field.options = options_for(&req.field_type, req.options);
        field.field_type = req.field_type;
        self.fields.save_field(&field).await?;

        info!(
            subsystem = "migration",
            component = "schema_migrator",
            op = "rename_field",
            user_id = %principal.user_id,
            field_id = %field_id,
            old_name = %old_name,
            new_name = %field.name,
            items_scanned = sweep.scanned,
            items_migrated = sweep.migrated,
            duration_ms = start.elapsed().as_millis() as u64,
            "Field updated"
        );

        Ok(MigrationReport {
            field,
            items_scanned: sweep.scanned,
            items_needing_migration: sweep.needing,
            items_migrated: sweep.migrated,
        })
    }

    /// Remove a field's key from every item of its category, then delete the
    /// field definition.
    pub async fn delete_field(
        &self,
        principal: &Principal,
        field_id: Uuid,
    ) -> Result<MigrationReport> {
        let start = Instant::now();
        let field = self.authorized_field(principal, field_id).await?;

        let change = KeyChange::Remove(field.name.clone());
        let sweep = self.sweep(&field, &change).await?;
        self.fields.delete_field(field.id).await?;

        info!(
            subsystem = "migration",
            component = "schema_migrator",
            op = "delete_field",
            user_id = %principal.user_id,
            field_id = %field_id,
            items_scanned = sweep.scanned,
            items_migrated = sweep.migrated,
            duration_ms = start.elapsed().as_millis() as u64,
            "Field deleted"
        );

        Ok(MigrationReport {
            field,
            items_scanned: sweep.scanned,
            items_needing_migration: sweep.needing,
            items_migrated: sweep.migrated,
        })
    }

    /// Fetch a field and check its category belongs to the principal.
    ///
    /// Fields of other owners are reported as not found.
    async fn authorized_field(&self, principal: &Principal, field_id: Uuid) -> Result<Field> {
        let field = self
            .fields
            .get_field(field_id)
            .await?
            .ok_or(Error::FieldNotFound(field_id))?;

        match self.owners.category_owner(field.category_id).await? {
            Some(owner) if principal.owns(owner) => Ok(field),
            _ => {
                debug!(
                    subsystem = "migration",
                    component = "schema_migrator",
                    user_id = %principal.user_id,
                    field_id = %field_id,
                    "Field not owned by principal"
                );
                Err(Error::FieldNotFound(field_id))
            }
        }
    }

    async fn authorize_category(&self, principal: &Principal, category_id: Uuid) -> Result<()> {
        match self.owners.category_owner(category_id).await? {
            Some(owner) if principal.owns(owner) => Ok(()),
            _ => Err(Error::CategoryNotFound(category_id)),
        }
    }

    /// Apply `change` to every item of the field's category.
    ///
    /// Each document is re-read right before it is rewritten so that edits
    /// made since the listing are not lost. Items deleted after the listing,
    /// either before the re-read or before the save, are skipped and counted
    /// neither as migrated nor as failed. All listed items are attempted; any
    /// other failure turns into [`Error::PartialMigration`].
    async fn sweep(&self, field: &Field, change: &KeyChange) -> Result<Sweep> {
        let item_ids = self
            .documents
            .list_item_ids(field.category_id)
            .await
            .map_err(|e| Error::PartialMigration {
                field_id: field.id,
                migrated: 0,
                total: 0,
                failed: Vec::new(),
                reason: format!("listing items failed: {}", e),
            })?;

        let mut sweep = Sweep {
            scanned: item_ids.len(),
            ..Sweep::default()
        };
        let mut failed = Vec::new();
        let mut last_error = None;

        for &item_id in &item_ids {
            let mut doc = match self.documents.get_item_document(item_id).await {
                Ok(Some(doc)) => doc,
                Ok(None) => {
                    trace!(item_id = %item_id, "Item vanished before migration, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(
                        subsystem = "migration",
                        op = change.op(),
                        field_id = %field.id,
                        item_id = %item_id,
                        error = %e,
                        "Failed to read item document"
                    );
                    sweep.needing += 1;
                    failed.push(item_id);
                    last_error = Some(e);
                    continue;
                }
            };

            if !change.apply(&mut doc) {
                trace!(item_id = %item_id, "Key absent, document unchanged");
                continue;
            }

            match self.documents.save_item_document(item_id, &doc).await {
                Ok(()) => {
                    sweep.needing += 1;
                    sweep.migrated += 1;
                    trace!(item_id = %item_id, "Item document migrated");
                }
                Err(Error::ItemNotFound(_)) => {
                    trace!(item_id = %item_id, "Item vanished before save, skipping");
                }
                Err(e) => {
                    warn!(
                        subsystem = "migration",
                        op = change.op(),
                        field_id = %field.id,
                        item_id = %item_id,
                        error = %e,
                        "Failed to save migrated item document"
                    );
                    sweep.needing += 1;
                    failed.push(item_id);
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            warn!(
                subsystem = "migration",
                op = change.op(),
                field_id = %field.id,
                items_migrated = sweep.migrated,
                items_failed = failed.len(),
                "Migration incomplete, field definition left unchanged"
            );
            return Err(Error::PartialMigration {
                field_id: field.id,
                migrated: sweep.migrated,
                total: sweep.needing,
                failed,
                reason: e.to_string(),
            });
        }

        Ok(sweep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocValue;
    use crate::memory::MemoryStore;
    use crate::models::{Category, CreateCategoryRequest, Item};
    use crate::traits::{CategoryRepository, ItemRepository, UserRepository};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Fixture {
        store: Arc<MemoryStore>,
        migrator: SchemaMigrator,
        principal: Principal,
        books: Category,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let user = store.create_user("ahmad@example.com").await.unwrap();
        let books = store
            .create_category(user.id, CreateCategoryRequest::new("Books"))
            .await
            .unwrap();
        let migrator = SchemaMigrator::new(store.clone(), store.clone(), store.clone());
        Fixture {
            store,
            migrator,
            principal: Principal::from(&user),
            books,
        }
    }

    impl Fixture {
        async fn field(&self, name: &str) -> Field {
            self.migrator
                .create_field(
                    &self.principal,
                    self.books.id,
                    CreateFieldRequest::new(name, FieldType::Text),
                )
                .await
                .unwrap()
        }

        async fn item(&self, pairs: &[(&str, &str)]) -> Item {
            let doc: Document = pairs.iter().copied().collect();
            self.store.create_item(self.books.id, doc).await.unwrap()
        }

        async fn doc(&self, item: &Item) -> Document {
            self.store.get_item_document(item.id).await.unwrap().unwrap()
        }

        fn rename_to(&self, name: &str) -> UpdateFieldRequest {
            UpdateFieldRequest {
                name: name.to_string(),
                field_type: FieldType::Text,
                options: None,
            }
        }
    }

    /// Document store that fails reads or writes for chosen items, or
    /// deletes them while a sweep is running.
    struct FlakyDocuments {
        inner: Arc<MemoryStore>,
        fail_saves: Mutex<HashSet<Uuid>>,
        fail_reads: Mutex<HashSet<Uuid>>,
        delete_after_listing: Mutex<HashSet<Uuid>>,
        delete_before_save: Mutex<HashSet<Uuid>>,
        fail_listing: bool,
        saves: AtomicUsize,
    }

    impl FlakyDocuments {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                fail_saves: Mutex::new(HashSet::new()),
                fail_reads: Mutex::new(HashSet::new()),
                delete_after_listing: Mutex::new(HashSet::new()),
                delete_before_save: Mutex::new(HashSet::new()),
                fail_listing: false,
                saves: AtomicUsize::new(0),
            }
        }

        fn heal(&self) {
            self.fail_saves.lock().unwrap().clear();
            self.fail_reads.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyDocuments {
        async fn list_item_ids(&self, category_id: Uuid) -> Result<Vec<Uuid>> {
            if self.fail_listing {
                return Err(Error::Internal("store offline".to_string()));
            }
            let ids = self.inner.list_item_ids(category_id).await?;
            let doomed: Vec<Uuid> = self.delete_after_listing.lock().unwrap().drain().collect();
            for id in doomed {
                self.inner.delete_item(id).await?;
            }
            Ok(ids)
        }

        async fn get_item_document(&self, item_id: Uuid) -> Result<Option<Document>> {
            if self.fail_reads.lock().unwrap().contains(&item_id) {
                return Err(Error::Internal("read timeout".to_string()));
            }
            self.inner.get_item_document(item_id).await
        }

        async fn save_item_document(&self, item_id: Uuid, data: &Document) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves.lock().unwrap().contains(&item_id) {
                return Err(Error::Internal("write rejected".to_string()));
            }
            let doomed = self.delete_before_save.lock().unwrap().remove(&item_id);
            if doomed {
                self.inner.delete_item(item_id).await?;
            }
            self.inner.save_item_document(item_id, data).await
        }
    }

    #[test]
    fn test_key_change_apply() {
        let mut doc: Document = [("Author", "James Clear")].into_iter().collect();
        let rename = KeyChange::Rename {
            from: "Author".to_string(),
            to: "Writer".to_string(),
        };
        assert!(rename.apply(&mut doc));
        assert!(!rename.apply(&mut doc));
        assert!(KeyChange::Remove("Writer".to_string()).apply(&mut doc));
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_rename_moves_key_in_items_that_have_it() {
        let fx = fixture().await;
        let author = fx.field("Author").await;
        let mut with_key = Vec::new();
        for i in 0..3 {
            let name = format!("Author {}", i);
            let item = fx.item(&[("Author", name.as_str())]).await;
            with_key.push((item, name));
        }
        let without = fx.item(&[("Title", "Untitled")]).await;

        let report = fx
            .migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap();

        assert_eq!(report.items_scanned, 4);
        assert_eq!(report.items_needing_migration, 3);
        assert_eq!(report.items_migrated, 3);
        assert_eq!(report.field.name, "Writer");

        for (item, original) in &with_key {
            let doc = fx.doc(item).await;
            assert!(!doc.contains_key("Author"));
            assert_eq!(doc.get("Writer"), Some(&DocValue::from(original.as_str())));
        }
        let doc = fx.doc(&without).await;
        assert!(!doc.contains_key("Writer"));
        assert_eq!(doc.len(), 1);

        let stored = fx.store.get_field(author.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Writer");
    }

    #[tokio::test]
    async fn test_rename_to_same_name_updates_metadata_only() {
        let fx = fixture().await;
        let status = fx.field("Status").await;
        let item = fx.item(&[("Status", "Read")]).await;

        let report = fx
            .migrator
            .rename_field(
                &fx.principal,
                status.id,
                UpdateFieldRequest {
                    name: "Status".to_string(),
                    field_type: FieldType::Select,
                    options: Some(vec!["Read".to_string(), "Unread".to_string()]),
                },
            )
            .await
            .unwrap();

        assert_eq!(report.items_scanned, 0);
        assert_eq!(report.items_migrated, 0);
        assert_eq!(report.field.field_type, FieldType::Select);
        assert_eq!(fx.doc(&item).await.get("Status"), Some(&DocValue::from("Read")));

        let stored = fx.store.get_field(status.id).await.unwrap().unwrap();
        assert_eq!(stored.field_type, FieldType::Select);
        assert_eq!(stored.options.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rename_replaces_options_wholesale() {
        let fx = fixture().await;
        let status = fx
            .migrator
            .create_field(
                &fx.principal,
                fx.books.id,
                CreateFieldRequest::new("Status", FieldType::Select)
                    .with_options(["Read", "Reading", "Unread"]),
            )
            .await
            .unwrap();

        let report = fx
            .migrator
            .rename_field(
                &fx.principal,
                status.id,
                UpdateFieldRequest {
                    name: "State".to_string(),
                    field_type: FieldType::Text,
                    options: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(report.field.options, None);
        assert_eq!(report.field.field_type, FieldType::Text);
    }

    #[tokio::test]
    async fn test_options_dropped_for_types_without_them() {
        let fx = fixture().await;
        let title = fx
            .migrator
            .create_field(
                &fx.principal,
                fx.books.id,
                CreateFieldRequest::new("Title", FieldType::Text).with_options(["ignored"]),
            )
            .await
            .unwrap();
        assert_eq!(title.options, None);

        let options = Some(vec!["Read".to_string(), "Unread".to_string()]);
        let status = fx
            .migrator
            .update_field_metadata(&fx.principal, title.id, FieldType::Select, options.clone())
            .await
            .unwrap();
        assert_eq!(status.options, options);

        let report = fx
            .migrator
            .rename_field(
                &fx.principal,
                title.id,
                UpdateFieldRequest {
                    name: "Pages".to_string(),
                    field_type: FieldType::Number,
                    options,
                },
            )
            .await
            .unwrap();
        assert_eq!(report.field.options, None);
        let stored = fx.store.get_field(title.id).await.unwrap().unwrap();
        assert_eq!(stored.options, None);
    }

    #[tokio::test]
    async fn test_rename_is_idempotent() {
        let fx = fixture().await;
        let author = fx.field("Author").await;
        let item = fx.item(&[("Author", "James Clear"), ("Title", "Atomic Habits")]).await;

        fx.migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap();
        let once = fx.doc(&item).await;

        let second = fx
            .migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap();
        assert_eq!(second.items_migrated, 0);
        assert_eq!(fx.doc(&item).await, once);
    }

    #[tokio::test]
    async fn test_rename_collision_last_write_wins() {
        let fx = fixture().await;
        let x = fx.field("X").await;
        let _shared = fx.field("Shared").await;
        let item = fx.item(&[("X", "x value"), ("Shared", "shared value")]).await;

        fx.migrator
            .rename_field(&fx.principal, x.id, fx.rename_to("Shared"))
            .await
            .unwrap();

        let doc = fx.doc(&item).await;
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get("Shared"), Some(&DocValue::from("x value")));
    }

    #[tokio::test]
    async fn test_delete_removes_key_and_field() {
        let fx = fixture().await;
        let status = fx.field("Status").await;
        let read = fx.item(&[("Status", "Read")]).await;
        let untouched = fx.item(&[("Title", "Atomic Habits")]).await;

        let report = fx
            .migrator
            .delete_field(&fx.principal, status.id)
            .await
            .unwrap();

        assert_eq!(report.items_scanned, 2);
        assert_eq!(report.items_migrated, 1);
        assert!(fx.doc(&read).await.is_empty());
        assert_eq!(fx.doc(&untouched).await.len(), 1);
        assert!(fx.store.get_field(status.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_books_scenario() {
        let fx = fixture().await;
        let _title = fx.field("Title").await;
        let author = fx.field("Author").await;
        let status = fx.field("Status").await;
        let item1 = fx
            .item(&[("Title", "Atomic Habits"), ("Author", "James Clear")])
            .await;
        let item2 = fx.item(&[("Status", "Read")]).await;

        fx.migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap();
        let expected: Document = [("Title", "Atomic Habits"), ("Writer", "James Clear")]
            .into_iter()
            .collect();
        assert_eq!(fx.doc(&item1).await, expected);

        fx.migrator
            .delete_field(&fx.principal, status.id)
            .await
            .unwrap();
        assert_eq!(fx.doc(&item1).await, expected);
        assert!(fx.doc(&item2).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_rejected_before_fetch() {
        let fx = fixture().await;
        // Unknown field id: validation must win over not-found.
        let err = fx
            .migrator
            .rename_field(&fx.principal, Uuid::new_v4(), fx.rename_to("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unknown_field_is_not_found() {
        let fx = fixture().await;
        let id = Uuid::new_v4();
        let err = fx.migrator.delete_field(&fx.principal, id).await.unwrap_err();
        assert!(matches!(err, Error::FieldNotFound(found) if found == id));
    }

    #[tokio::test]
    async fn test_foreign_principal_sees_not_found() {
        let fx = fixture().await;
        let author = fx.field("Author").await;
        let item = fx.item(&[("Author", "James Clear")]).await;

        let intruder = fx.store.create_user("intruder").await.unwrap();
        let intruder = Principal::from(&intruder);

        let err = fx
            .migrator
            .rename_field(&intruder, author.id, fx.rename_to("Writer"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FieldNotFound(_)));

        let err = fx.migrator.delete_field(&intruder, author.id).await.unwrap_err();
        assert!(err.is_not_found());

        assert!(fx.doc(&item).await.contains_key("Author"));
        assert!(fx.store.get_field(author.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_field_rejects_duplicate_name() {
        let fx = fixture().await;
        fx.field("Title").await;
        let err = fx
            .migrator
            .create_field(
                &fx.principal,
                fx.books.id,
                CreateFieldRequest::new(" Title ", FieldType::Text),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_field_in_foreign_category() {
        let fx = fixture().await;
        let intruder = fx.store.create_user("intruder").await.unwrap();
        let err = fx
            .migrator
            .create_field(
                &Principal::from(&intruder),
                fx.books.id,
                CreateFieldRequest::new("Title", FieldType::Text),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_metadata_touches_no_documents() {
        let fx = fixture().await;
        let rating = fx.field("My Rating").await;
        let item = fx.item(&[("My Rating", "⭐⭐⭐")]).await;

        let field = fx
            .migrator
            .update_field_metadata(
                &fx.principal,
                rating.id,
                FieldType::Select,
                Some(vec!["⭐".to_string(), "⭐⭐⭐".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(field.name, "My Rating");
        assert_eq!(field.field_type, FieldType::Select);
        assert_eq!(fx.doc(&item).await.get("My Rating"), Some(&DocValue::from("⭐⭐⭐")));
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_field_and_retry_completes() {
        let fx = fixture().await;
        let author = fx.field("Author").await;
        let a = fx.item(&[("Author", "A")]).await;
        let b = fx.item(&[("Author", "B")]).await;
        let c = fx.item(&[("Author", "C")]).await;

        let flaky = Arc::new(FlakyDocuments::new(fx.store.clone()));
        flaky.fail_saves.lock().unwrap().insert(b.id);
        let migrator = SchemaMigrator::new(flaky.clone(), fx.store.clone(), fx.store.clone());

        let err = migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap_err();
        match &err {
            Error::PartialMigration {
                field_id,
                migrated,
                total,
                failed,
                ..
            } => {
                assert_eq!(*field_id, author.id);
                assert_eq!(*migrated, 2);
                assert_eq!(*total, 3);
                assert_eq!(failed, &vec![b.id]);
            }
            other => panic!("Expected PartialMigration, got {:?}", other),
        }
        assert!(err.is_retryable());
        // Every item was attempted despite the failure.
        assert_eq!(flaky.saves.load(Ordering::SeqCst), 3);

        let stored = fx.store.get_field(author.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Author");
        assert!(fx.doc(&a).await.contains_key("Writer"));
        assert!(fx.doc(&b).await.contains_key("Author"));
        assert!(fx.doc(&c).await.contains_key("Writer"));

        flaky.heal();
        let report = migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap();
        assert_eq!(report.items_migrated, 1);
        for item in [&a, &b, &c] {
            let doc = fx.doc(item).await;
            assert!(doc.contains_key("Writer"));
            assert!(!doc.contains_key("Author"));
        }
    }

    #[tokio::test]
    async fn test_partial_delete_keeps_field() {
        let fx = fixture().await;
        let status = fx.field("Status").await;
        let item = fx.item(&[("Status", "Read")]).await;

        let flaky = Arc::new(FlakyDocuments::new(fx.store.clone()));
        flaky.fail_reads.lock().unwrap().insert(item.id);
        let migrator = SchemaMigrator::new(flaky.clone(), fx.store.clone(), fx.store.clone());

        let err = migrator
            .delete_field(&fx.principal, status.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PartialMigration { migrated: 0, total: 1, .. }));
        assert!(fx.store.get_field(status.id).await.unwrap().is_some());

        flaky.heal();
        migrator.delete_field(&fx.principal, status.id).await.unwrap();
        assert!(fx.doc(&item).await.is_empty());
        assert!(fx.store.get_field(status.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_item_deleted_after_listing_is_skipped() {
        let fx = fixture().await;
        let author = fx.field("Author").await;
        let kept = fx.item(&[("Author", "James Clear")]).await;
        let gone = fx.item(&[("Author", "Frank Turek")]).await;

        let flaky = Arc::new(FlakyDocuments::new(fx.store.clone()));
        flaky.delete_after_listing.lock().unwrap().insert(gone.id);
        let migrator = SchemaMigrator::new(flaky.clone(), fx.store.clone(), fx.store.clone());

        let report = migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap();

        assert_eq!(report.items_scanned, 2);
        assert_eq!(report.items_needing_migration, 1);
        assert_eq!(report.items_migrated, 1);
        assert_eq!(flaky.saves.load(Ordering::SeqCst), 1);
        assert!(fx.doc(&kept).await.contains_key("Writer"));
        assert!(fx.store.get_item(gone.id).await.unwrap().is_none());
        assert_eq!(report.field.name, "Writer");
    }

    #[tokio::test]
    async fn test_item_deleted_before_save_is_skipped() {
        let fx = fixture().await;
        let status = fx.field("Status").await;
        let kept = fx.item(&[("Status", "Read")]).await;
        let gone = fx.item(&[("Status", "Unread")]).await;

        let flaky = Arc::new(FlakyDocuments::new(fx.store.clone()));
        flaky.delete_before_save.lock().unwrap().insert(gone.id);
        let migrator = SchemaMigrator::new(flaky.clone(), fx.store.clone(), fx.store.clone());

        let report = migrator
            .delete_field(&fx.principal, status.id)
            .await
            .unwrap();

        assert_eq!(report.items_scanned, 2);
        assert_eq!(report.items_needing_migration, 1);
        assert_eq!(report.items_migrated, 1);
        assert_eq!(flaky.saves.load(Ordering::SeqCst), 2);
        assert!(fx.doc(&kept).await.is_empty());
        assert!(fx.store.get_field(status.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_failure_is_partial_migration() {
        let fx = fixture().await;
        let author = fx.field("Author").await;

        let mut flaky = FlakyDocuments::new(fx.store.clone());
        flaky.fail_listing = true;
        let migrator = SchemaMigrator::new(Arc::new(flaky), fx.store.clone(), fx.store.clone());

        let err = migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PartialMigration { migrated: 0, total: 0, .. }));
        assert!(!err.is_not_found());

        let stored = fx.store.get_field(author.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Author");
    }

    #[tokio::test]
    async fn test_items_in_other_categories_untouched() {
        let fx = fixture().await;
        let author = fx.field("Author").await;
        let podcasts = fx
            .store
            .create_category(fx.principal.user_id, CreateCategoryRequest::new("Podcasts"))
            .await
            .unwrap();
        let doc: Document = [("Author", "Host")].into_iter().collect();
        let other = fx.store.create_item(podcasts.id, doc).await.unwrap();

        fx.migrator
            .rename_field(&fx.principal, author.id, fx.rename_to("Writer"))
            .await
            .unwrap();

        let doc = fx.store.get_item_document(other.id).await.unwrap().unwrap();
        assert!(doc.contains_key("Author"));
    }
}

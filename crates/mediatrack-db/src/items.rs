//! Item repository implementation.
//!
//! Item documents live in a `JSONB` column and are read and written whole.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::trace;
use uuid::Uuid;

use mediatrack_core::{Document, DocumentStore, Error, Item, ItemRepository, Result};

/// PostgreSQL implementation of ItemRepository and DocumentStore.
#[derive(Clone)]
pub struct PgItemRepository {
    pool: Pool<Postgres>,
}

impl PgItemRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn document_from_row(r: &PgRow) -> Result<Document> {
    let data = r
        .try_get::<JsonValue, _>("data")
        .map_err(Error::Database)?;
    Document::from_json(&data)
}

fn item_from_row(r: &PgRow) -> Result<Item> {
    Ok(Item {
        id: r.get("id"),
        category_id: r.get("category_id"),
        created_at_utc: r.get("created_at_utc"),
        data: document_from_row(r)?,
    })
}

#[async_trait]
impl DocumentStore for PgItemRepository {
    async fn list_item_ids(&self, category_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT id FROM item WHERE category_id = $1 ORDER BY created_at_utc DESC, id DESC",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    async fn get_item_document(&self, item_id: Uuid) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT data FROM item WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn save_item_document(&self, item_id: Uuid, data: &Document) -> Result<()> {
        let result = sqlx::query("UPDATE item SET data = $2 WHERE id = $1")
            .bind(item_id)
            .bind(data.to_json())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(item_id));
        }
        trace!(
            subsystem = "database",
            component = "item_repo",
            item_id = %item_id,
            "Item document saved"
        );
        Ok(())
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    async fn create_item(&self, category_id: Uuid, data: Document) -> Result<Item> {
        let row = sqlx::query(
            r#"
            INSERT INTO item (id, category_id, data, created_at_utc)
            VALUES ($1, $2, $3, $4)
            RETURNING id, category_id, data, created_at_utc
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(category_id)
        .bind(data.to_json())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                Error::CategoryNotFound(category_id)
            }
            other => Error::Database(other),
        })?;

        item_from_row(&row)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        let row = sqlx::query("SELECT id, category_id, data, created_at_utc FROM item WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items_by_category(&self, category_id: Uuid) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT id, category_id, data, created_at_utc
            FROM item
            WHERE category_id = $1
            ORDER BY created_at_utc DESC, id DESC
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(item_from_row).collect()
    }

    async fn delete_item(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM item WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(id));
        }
        Ok(())
    }
}

//! Category repository implementation.
//!
//! Also resolves category ownership for the migration engine.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use mediatrack_core::{
    Category, CategoryRepository, CreateCategoryRequest, Error, OwnershipResolver, Result,
};

/// PostgreSQL implementation of CategoryRepository.
#[derive(Clone)]
pub struct PgCategoryRepository {
    pool: Pool<Postgres>,
}

impl PgCategoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn category_from_row(r: &PgRow) -> Category {
    Category {
        id: r.get("id"),
        owner_id: r.get("owner_id"),
        name: r.get("name"),
        description: r.get("description"),
        created_at_utc: r.get("created_at_utc"),
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create_category(&self, owner_id: Uuid, req: CreateCategoryRequest) -> Result<Category> {
        let description = req.description_or_default();
        let row = sqlx::query(
            r#"
            INSERT INTO category (id, owner_id, name, description, created_at_utc)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, name, description, created_at_utc
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(&req.name)
        .bind(&description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                Error::NotFound(format!("user {}", owner_id))
            }
            other => Error::Database(other),
        })?;

        Ok(category_from_row(&row))
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, name, description, created_at_utc
            FROM category
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(category_from_row))
    }

    async fn list_categories(&self, owner_id: Uuid) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, name, description, created_at_utc
            FROM category
            WHERE owner_id = $1
            ORDER BY name, id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let result = sqlx::query("UPDATE category SET name = $2, description = $3 WHERE id = $1")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.description)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::CategoryNotFound(category.id));
        }
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> Result<()> {
        // Fields and items go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::CategoryNotFound(id));
        }
        debug!(
            subsystem = "database",
            component = "category_repo",
            category_id = %id,
            "Category deleted"
        );
        Ok(())
    }
}

#[async_trait]
impl OwnershipResolver for PgCategoryRepository {
    async fn category_owner(&self, category_id: Uuid) -> Result<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM category WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(owner)
    }
}

//! Field definition repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use mediatrack_core::{CreateFieldRequest, Error, Field, FieldRegistry, FieldType, Result};

/// PostgreSQL implementation of FieldRegistry.
#[derive(Clone)]
pub struct PgFieldRepository {
    pool: Pool<Postgres>,
}

impl PgFieldRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn field_from_row(r: &PgRow) -> Field {
    Field {
        id: r.get("id"),
        category_id: r.get("category_id"),
        name: r.get("name"),
        field_type: FieldType::parse(r.get::<&str, _>("field_type")),
        options: r.get::<Option<Vec<String>>, _>("options"),
    }
}

#[async_trait]
impl FieldRegistry for PgFieldRepository {
    async fn create_field(&self, category_id: Uuid, req: CreateFieldRequest) -> Result<Field> {
        let row = sqlx::query(
            r#"
            INSERT INTO field (id, category_id, name, field_type, options, created_at_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, category_id, name, field_type, options
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(category_id)
        .bind(&req.name)
        .bind(req.field_type.as_str())
        .bind(&req.options)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                Error::CategoryNotFound(category_id)
            }
            other => Error::Database(other),
        })?;

        Ok(field_from_row(&row))
    }

    async fn get_field(&self, id: Uuid) -> Result<Option<Field>> {
        let row = sqlx::query(
            "SELECT id, category_id, name, field_type, options FROM field WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(field_from_row))
    }

    async fn list_fields(&self, category_id: Uuid) -> Result<Vec<Field>> {
        let rows = sqlx::query(
            r#"
            SELECT id, category_id, name, field_type, options
            FROM field
            WHERE category_id = $1
            ORDER BY created_at_utc, id
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(field_from_row).collect())
    }

    async fn save_field(&self, field: &Field) -> Result<()> {
        let result = sqlx::query(
            "UPDATE field SET name = $2, field_type = $3, options = $4 WHERE id = $1",
        )
        .bind(field.id)
        .bind(&field.name)
        .bind(field.field_type.as_str())
        .bind(&field.options)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::FieldNotFound(field.id));
        }
        Ok(())
    }

    async fn delete_field(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM field WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::FieldNotFound(id));
        }
        Ok(())
    }
}

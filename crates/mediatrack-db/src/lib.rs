//! # mediatrack-db
//!
//! PostgreSQL database layer for mediatrack.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations of the `mediatrack-core` traits
//! - Embedded SQL migrations (`migrations` feature, on by default)
//!
//! ## Example
//!
//! ```rust,ignore
//! use mediatrack_db::{Database, PoolConfig};
//! use mediatrack_core::{Principal, UpdateFieldRequest};
//!
//! let db = Database::connect_with_config(url, PoolConfig::new()).await?;
//! db.migrate().await?;
//!
//! let report = db
//!     .migrator()
//!     .rename_field(&principal, field_id, request)
//!     .await?;
//! println!("{} items migrated", report.items_migrated);
//! ```

pub mod categories;
pub mod fields;
pub mod items;
pub mod pool;
pub mod users;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::sync::Arc;

use mediatrack_core::{Catalog, Result, SchemaMigrator};
#[cfg(feature = "migrations")]
use mediatrack_core::Error;

pub use categories::PgCategoryRepository;
pub use fields::PgFieldRepository;
pub use items::PgItemRepository;
pub use pool::{create_pool_with_config, log_pool_metrics, PoolConfig};
pub use users::PgUserRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub users: PgUserRepository,
    /// Categories; also answers ownership queries.
    pub categories: PgCategoryRepository,
    pub fields: PgFieldRepository,
    /// Items and their JSONB documents.
    pub items: PgItemRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            categories: PgCategoryRepository::new(pool.clone()),
            fields: PgFieldRepository::new(pool.clone()),
            items: PgItemRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Schema migration engine backed by this database.
    pub fn migrator(&self) -> SchemaMigrator {
        SchemaMigrator::new(
            Arc::new(self.items.clone()),
            Arc::new(self.fields.clone()),
            Arc::new(self.categories.clone()),
        )
    }

    /// Owner-scoped catalog service backed by this database.
    pub fn catalog(&self) -> Catalog {
        Catalog::new(
            Arc::new(self.users.clone()),
            Arc::new(self.categories.clone()),
            Arc::new(self.fields.clone()),
            Arc::new(self.items.clone()),
        )
    }
}

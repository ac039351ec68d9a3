//! Fundwatch Database Layer
//!
//! Provides the `SQLite` record store for campaigns, their latest scan
//! results and the per-run failure log. Uses `SQLx` with embedded migrations.
//!
//! # Example
//!
//! ```ignore
//! use fundwatch_db::Database;
//!
//! let db = Database::new("fundwatch.db").await?;
//! db.run_migrations().await?;
//! let campaigns = fundwatch_db::campaigns::list_campaigns(db.pool(), "alpha", false).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod campaigns;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod scan_failures;

// Re-export commonly used types
pub use campaigns::CampaignRecord;
pub use connection::StorePool;
pub use error::{DatabaseError, Result};
pub use scan_failures::StoredFailure;

use std::path::Path;

/// High-level database interface with migrations.
#[derive(Debug, Clone)]
pub struct Database {
    pool: StorePool,
}

impl Database {
    /// Open the database at `path` (or `:memory:` for in-memory).
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = StorePool::new(path).await?;
        Ok(Self { pool })
    }

    /// Open the database and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(self.pool.pool()).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

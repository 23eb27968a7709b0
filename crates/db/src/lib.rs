//! SQLite persistence for the generic entity store.
//!
//! The [`EntityStore`] serves a validated [`Catalog`](formstore_core::schema::Catalog):
//! one table per entity type, created idempotently when the store opens.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub mod auth;
pub mod config;
pub mod ddl;
pub mod error;
pub mod repo;
mod sql;
pub mod store;
pub mod tx;
pub mod workflow;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use store::EntityStore;
pub use tx::StoreTx;

pub type DbPool = sqlx::SqlitePool;

/// Create a connection pool for the configured database file.
///
/// The file is created if missing. Foreign keys are declared in the schema
/// but only enforced when `config.enforce_foreign_keys` is set.
pub async fn create_pool(config: &StoreConfig) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(&config.database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.busy_timeout)
        .foreign_keys(config.enforce_foreign_keys);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;
    tracing::info!(
        path = %config.database_path.display(),
        max_connections = config.max_connections,
        "Database connection pool created"
    );
    Ok(pool)
}

/// Round-trip a trivial query to confirm the database is usable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! dc-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! ```text
//! crates/storefront/migrations/
//! ├── 20260301000000_identity.sql
//! ├── 20260301000100_catalog.sql
//! └── 20260301000200_carts_orders.sql
//! ```

use thiserror::Error;

use dream_collections_storefront::db;

use super::{MissingDatabaseUrl, database_url};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingDatabaseUrl),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending storefront migration.
///
/// # Errors
///
/// Returns error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    pool.close().await;
    Ok(())
}

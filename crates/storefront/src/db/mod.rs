//! Database operations for storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - Accounts (password and OTP sign-in)
//! - `otp_verifications` - Hashed one-time passwords
//! - `categories` - Category tree (self-referencing `parent_id`)
//! - `products`, `product_variants` - Catalog and per-size stock
//! - `carts`, `cart_items` - One server-side cart per user
//! - `orders`, `order_items`, `order_status_logs` - Placed orders and their history
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p dream-collections-cli -- migrate
//! ```

pub mod carts;
pub mod categories;
pub mod orders;
pub mod otp;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use orders::OrderRepository;
pub use otp::OtpRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors surfaced by the repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row held a value the domain types refuse, e.g. an unknown order status.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// Unique username, email, phone or SKU already taken.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map unique violations to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Open the shared pool used by the server and the CLI.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

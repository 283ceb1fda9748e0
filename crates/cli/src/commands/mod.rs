//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod otp;
pub mod seed;
pub mod shop;

use secrecy::SecretString;

/// Database URL for commands that talk to `PostgreSQL` directly.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub fn database_url() -> Result<SecretString, MissingDatabaseUrl> {
    dotenvy::dotenv().ok();
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingDatabaseUrl)
}

#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: STOREFRONT_DATABASE_URL (or DATABASE_URL)")]
pub struct MissingDatabaseUrl;

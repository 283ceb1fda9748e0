//! Admin account management.
//!
//! # Usage
//!
//! ```bash
//! dc-cli admin create -u admin -e admin@dreamcollections.com -p 'long-password'
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use thiserror::Error;

use dream_collections_core::{Email, PhoneNumber, UserId, UserRole};
use dream_collections_storefront::db::{self, RepositoryError, UserRepository, users::NewUser};
use dream_collections_storefront::services::auth::{AuthError, hash_password, validate_password};

use super::{MissingDatabaseUrl, database_url};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingDatabaseUrl),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("User already exists: {0}")]
    UserExists(String),
}

/// Details for a new administrator.
#[derive(Debug)]
pub struct NewAdmin<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
}

/// Create an administrator account directly in the database.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns error if the details are invalid, the username or email is taken,
/// or the database is unreachable.
pub async fn create_user(admin: &NewAdmin<'_>) -> Result<UserId, AdminError> {
    let email =
        Email::parse(admin.email).map_err(|_| AdminError::InvalidEmail(admin.email.to_owned()))?;
    let phone = admin
        .phone
        .map(|p| PhoneNumber::parse(p).map_err(|_| AdminError::InvalidPhone(p.to_owned())))
        .transpose()?;
    validate_password(admin.password)?;

    let database_url = database_url()?;
    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;
    let users = UserRepository::new(&pool);

    if users.username_exists(admin.username).await? {
        return Err(AdminError::UserExists(admin.username.to_owned()));
    }
    if users.email_exists(&email).await? {
        return Err(AdminError::UserExists(email.to_string()));
    }

    let password_hash = hash_password(admin.password)?;
    let user = users
        .create(&NewUser {
            username: admin.username,
            email: &email,
            phone_number: phone.as_ref(),
            first_name: admin.first_name,
            last_name: admin.last_name,
            password_hash: Some(&password_hash),
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Username: {}, Email: {}",
        user.id,
        user.username,
        user.email
    );

    pool.close().await;
    Ok(user.id)
}

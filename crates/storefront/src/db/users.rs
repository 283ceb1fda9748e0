//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dream_collections_core::{Email, PhoneNumber, UserId, UserRole};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

const USER_COLUMNS: &str = "id, username, email, phone_number, first_name, last_name, \
                            password_hash, role, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    phone_number: Option<String>,
    first_name: String,
    last_name: String,
    password_hash: Option<String>,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<(User, Option<String>), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone_number = self
            .phone_number
            .as_deref()
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid phone number in database: {e}"))
            })?;

        Ok((
            User {
                id: self.id,
                username: self.username,
                email,
                phone_number,
                first_name: self.first_name,
                last_name: self.last_name,
                role: self.role,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            self.password_hash,
        ))
    }
}

/// Fields for a new account.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a Email,
    pub phone_number: Option<&'a PhoneNumber>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    /// `None` for accounts created through OTP sign-in.
    pub password_hash: Option<&'a str>,
    pub role: UserRole,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored email or phone is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(|r| r.into_user().map(|(user, _)| user)).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("lower(email) = lower($1)", email.as_str())
            .await
    }

    /// Get a user by their phone number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("phone_number = $1", phone.as_str())
            .await
    }

    /// Look up an account by username, email or phone number, returning the
    /// stored password hash alongside it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        login_id: &str,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE username = $1 OR lower(email) = lower($1) OR phone_number = $1 \
             ORDER BY (username = $1) DESC \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(login_id)
            .fetch_optional(self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Whether `username` is already taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_exists(&self, username: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Whether an account already uses `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))",
        )
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username, email or phone is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser<'_>) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users \
                 (username, email, phone_number, first_name, last_name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(new_user.username)
            .bind(new_user.email.as_str())
            .bind(new_user.phone_number.map(PhoneNumber::as_str))
            .bind(new_user.first_name)
            .bind(new_user.last_name)
            .bind(new_user.password_hash)
            .bind(new_user.role)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "user"))?;

        row.into_user().map(|(user, _)| user)
    }

    /// Attach a phone number to an account that has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if another account uses the number.
    pub async fn set_phone_number(
        &self,
        id: UserId,
        phone: &PhoneNumber,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE users SET phone_number = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(phone.as_str())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "phone number"))?
            .ok_or(RepositoryError::NotFound)?;

        row.into_user().map(|(user, _)| user)
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        value: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {condition}");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool)
            .await?;

        row.map(|r| r.into_user().map(|(user, _)| user)).transpose()
    }
}

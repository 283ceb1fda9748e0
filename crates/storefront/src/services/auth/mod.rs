//! Authentication service.
//!
//! Password sign-up and sign-in, refresh, and the JWTs handed out by both
//! this service and OTP verification.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenKind, TokenService};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use dream_collections_core::api::{JwtResponse, LoginRequest, SignupRequest};
use dream_collections_core::{Email, PhoneNumber, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new account with a password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the username is blank.
    /// Returns `AuthError::InvalidEmail` or `AuthError::InvalidPhone` for malformed contact details.
    /// Returns `AuthError::InvalidRole` for an unknown role.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UsernameTaken` or `AuthError::EmailInUse` on duplicates.
    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn signup(&self, req: &SignupRequest) -> Result<User, AuthError> {
        let username = req.username.trim();
        if username.is_empty() {
            return Err(AuthError::Validation("Username is required".to_owned()));
        }
        let email = Email::parse(&req.email)?;
        let phone = req
            .phone_number
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PhoneNumber::parse)
            .transpose()?;
        let role = match req.role.as_deref() {
            None | Some("") => UserRole::Customer,
            Some(raw) => raw
                .parse::<UserRole>()
                .map_err(|_| AuthError::InvalidRole(raw.to_owned()))?,
        };
        validate_password(&req.password)?;

        if self.users.username_exists(username).await? {
            return Err(AuthError::UsernameTaken);
        }
        if self.users.email_exists(&email).await? {
            return Err(AuthError::EmailInUse);
        }

        let password_hash = hash_password(&req.password)?;
        let user = self
            .users
            .create(&NewUser {
                username,
                email: &email,
                phone_number: phone.as_ref(),
                first_name: req.first_name.trim(),
                last_name: req.last_name.trim(),
                password_hash: Some(&password_hash),
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) if phone.is_some() => AuthError::PhoneInUse,
                RepositoryError::Conflict(_) => AuthError::UsernameTaken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "Account registered");
        Ok(user)
    }

    /// Sign in with a username, email or phone number and a password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the account is unknown, has
    /// no password, or the password is wrong.
    #[instrument(skip(self, req))]
    pub async fn signin(&self, req: &LoginRequest) -> Result<JwtResponse, AuthError> {
        let (user, password_hash) = self
            .users
            .get_with_password_hash(req.login_id.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = password_hash.ok_or(AuthError::InvalidCredentials)?;

        verify_password(&req.password, &password_hash)?;

        issue_tokens(self.tokens, &user)
    }

    /// Trade a refresh token for a fresh token pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is invalid or its account is gone.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<JwtResponse, AuthError> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let user = self
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("account no longer exists".to_owned()))?;

        issue_tokens(self.tokens, &user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: dream_collections_core::UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Access and refresh tokens plus the profile fields the client stores.
///
/// # Errors
///
/// Returns `AuthError::TokenSigning` if a token cannot be signed.
pub fn issue_tokens(tokens: &TokenService, user: &User) -> Result<JwtResponse, AuthError> {
    let identity = user.identity();
    Ok(JwtResponse {
        access_token: tokens.issue_access(&identity)?,
        refresh_token: Some(tokens.issue_refresh(&identity)?),
        token_type: "Bearer".to_owned(),
        id: user.id,
        username: user.username.clone(),
        email: user.email.to_string(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        phone_number: user.phone_number.as_ref().map(ToString::to_string),
        roles: vec![user.role.authority().to_owned()],
    })
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a secret (password or OTP) using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a secret against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unparsable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }
}

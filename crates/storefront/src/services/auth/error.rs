//! Authentication error types.
//!
//! Messages for the sign-up conflicts are returned to clients verbatim.

use thiserror::Error;

use dream_collections_core::{EmailError, PhoneNumberError};

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] PhoneNumberError),

    /// Wrong password, unknown login id, or an expired/used OTP.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("Username is already taken!")]
    UsernameTaken,

    #[error("Email is already in use!")]
    EmailInUse,

    #[error("Phone number is already in use!")]
    PhoneInUse,

    /// Sign-up asked for a role name that does not exist.
    #[error("Error: Role '{0}' is not found.")]
    InvalidRole(String),

    #[error("{0}")]
    Validation(String),

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Bearer or refresh token failed verification.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token signing failed: {0}")]
    TokenSigning(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}

//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dream_collections_core::api::UserProfile;
use dream_collections_core::{Email, PhoneNumber, UserId, UserRole};

/// A storefront account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    /// `None` for accounts created with a username and password only.
    pub phone_number: Option<PhoneNumber>,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view of this account.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: self.phone_number.as_ref().map(ToString::to_string),
            role: self.role,
        }
    }

    /// Identity carried in access tokens.
    #[must_use]
    pub fn identity(&self) -> AuthenticatedUser {
        AuthenticatedUser {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// The caller behind a verified bearer token.
///
/// Built from token claims alone; handlers that need the full account load it
/// by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

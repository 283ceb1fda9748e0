//! HS256 access and refresh tokens.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use dream_collections_core::{UserId, UserRole};

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::AuthenticatedUser;

/// Which of the two token kinds a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Authorities, e.g. `ROLE_CUSTOMER`.
    pub roles: Vec<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub typ: TokenKind,
}

impl Claims {
    /// The caller these claims describe.
    #[must_use]
    pub fn identity(&self) -> AuthenticatedUser {
        let role = if self.roles.iter().any(|r| r == UserRole::Admin.authority()) {
            UserRole::Admin
        } else {
            UserRole::Customer
        };
        AuthenticatedUser {
            id: self.user_id,
            username: self.sub.clone(),
            role,
        }
    }
}

/// Signs and verifies tokens with the configured secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            access_ttl_secs: config.expiration_secs,
            refresh_ttl_secs: config.refresh_expiration_secs,
        }
    }

    /// Lifetime of access tokens in seconds.
    #[must_use]
    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue_access(&self, user: &AuthenticatedUser) -> Result<String, AuthError> {
        self.issue(user, TokenKind::Access, self.access_ttl_secs)
    }

    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue_refresh(&self, user: &AuthenticatedUser) -> Result<String, AuthError> {
        self.issue(user, TokenKind::Refresh, self.refresh_ttl_secs)
    }

    /// Verify an access token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad signature, issuer or kind, or
    /// an expired token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token, TokenKind::Access)
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` unless `token` is a valid refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token, TokenKind::Refresh)
    }

    fn issue(
        &self,
        user: &AuthenticatedUser,
        typ: TokenKind,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.username.clone(),
            user_id: user.id,
            roles: vec![user.role.authority().to_owned()],
            iss: self.issuer.clone(),
            iat: now,
            exp: now + ttl_secs,
            typ,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenSigning(e.to_string()))
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if data.claims.typ != expected {
            return Err(AuthError::InvalidToken("wrong token type".to_owned()));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(issuer: &str, ttl: i64) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: SecretString::from("vR7#qL2!mX9$wK4@tB8^zN3&hJ6*pF1%"),
            issuer: issuer.to_owned(),
            expiration_secs: ttl,
            refresh_expiration_secs: ttl * 30,
        })
    }

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser {
            id: UserId::new(7),
            username: "alice".to_owned(),
            role: UserRole::Admin,
        }
    }

    #[test]
    fn test_access_token_carries_identity() {
        let tokens = service("dreamcollections", 3600);
        let token = tokens.issue_access(&alice()).unwrap();
        let claims = tokens.verify_access(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec!["ROLE_ADMIN".to_owned()]);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.identity(), alice());
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let tokens = service("dreamcollections", 3600);
        let refresh = tokens.issue_refresh(&alice()).unwrap();
        let access = tokens.issue_access(&alice()).unwrap();

        assert!(tokens.verify_access(&refresh).is_err());
        assert!(tokens.verify_refresh(&access).is_err());
        assert!(tokens.verify_refresh(&refresh).is_ok());
    }

    #[test]
    fn test_rejects_foreign_issuer() {
        let token = service("someone-else", 3600).issue_access(&alice()).unwrap();
        assert!(service("dreamcollections", 3600).verify_access(&token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let tokens = service("dreamcollections", -10);
        let token = tokens.issue_access(&alice()).unwrap();
        assert!(tokens.verify_access(&token).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(service("dreamcollections", 60).verify_access("not.a.jwt").is_err());
    }
}

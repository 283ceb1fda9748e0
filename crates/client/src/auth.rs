//! Sign-in, OTP login and the stored session.
//!
//! A session is the pair of `token` and `user` in storage; the client is
//! authenticated only while both are present.

use tracing::{info, instrument, warn};

use dream_collections_core::OtpPurpose;
use dream_collections_core::api::{
    JwtResponse, LoginRequest, MessageResponse, OtpResendRequest, OtpResponse, OtpSendRequest,
    OtpVerifyRequest, RefreshRequest, SignupRequest, UserProfile,
};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::storage::{Storage, keys, read_json, write_json};

/// Whether storage holds both a token and a user.
#[must_use]
pub fn is_authenticated(storage: &dyn Storage) -> bool {
    storage.get(keys::TOKEN).is_some_and(|t| !t.is_empty()) && storage.get(keys::USER).is_some()
}

/// Account operations against `/auth` and `/users`.
#[derive(Debug, Clone)]
pub struct AuthSession {
    api: ApiClient,
}

impl AuthSession {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        is_authenticated(self.api.storage())
    }

    /// The signed-in user as stored at sign-in.
    #[must_use]
    pub fn current_user(&self) -> Option<JwtResponse> {
        read_json(self.api.storage(), keys::USER)
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.api.storage().get(keys::TOKEN)
    }

    /// Register a password account.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the details are rejected.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn signup(&self, request: &SignupRequest) -> Result<MessageResponse, ClientError> {
        self.api.post("/auth/signup", request).await
    }

    /// Sign in by username, email or phone number and store the session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn login(&self, login_id: &str, password: &str) -> Result<JwtResponse, ClientError> {
        let request = LoginRequest {
            login_id: login_id.to_string(),
            password: password.to_string(),
        };
        let jwt: JwtResponse = self.api.post("/auth/signin", &request).await?;
        self.store(&jwt)?;
        info!(user_id = %jwt.id, "Signed in");
        Ok(jwt)
    }

    /// Ask for a login code.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server refuses to send.
    #[instrument(skip(self, email))]
    pub async fn send_otp(
        &self,
        phone_number: &str,
        email: Option<&str>,
    ) -> Result<OtpResponse, ClientError> {
        let request = OtpSendRequest {
            phone_number: phone_number.to_string(),
            email: email.map(String::from),
            purpose: Some(OtpPurpose::Login),
        };
        self.api.post("/auth/otp/send", &request).await
    }

    /// Verify a login code and store the session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the code is rejected.
    #[instrument(skip(self, email, otp))]
    pub async fn verify_otp(
        &self,
        phone_number: &str,
        email: Option<&str>,
        otp: &str,
    ) -> Result<JwtResponse, ClientError> {
        let request = OtpVerifyRequest {
            phone_number: phone_number.to_string(),
            email: email.map(String::from),
            otp: otp.to_string(),
        };
        let jwt: JwtResponse = self.api.post("/auth/otp/verify", &request).await?;
        self.store(&jwt)?;
        info!(user_id = %jwt.id, "Signed in with OTP");
        Ok(jwt)
    }

    /// Send a fresh login code.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server refuses to send.
    #[instrument(skip(self, email))]
    pub async fn resend_otp(
        &self,
        phone_number: &str,
        email: Option<&str>,
    ) -> Result<OtpResponse, ClientError> {
        let request = OtpResendRequest {
            phone_number: phone_number.to_string(),
            email: email.map(String::from),
        };
        self.api.post("/auth/otp/resend", &request).await
    }

    /// Trade the stored refresh token for a new access token.
    ///
    /// The answer replaces the stored user; a response without a refresh
    /// token keeps the stored one. A missing or rejected refresh token ends
    /// the session. An unreachable server leaves it in place.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if no refresh token is stored, or the
    /// request error.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<JwtResponse, ClientError> {
        let stored = self.current_user();
        let Some(refresh_token) = stored.as_ref().and_then(|user| user.refresh_token.clone())
        else {
            self.logout()?;
            return Err(ClientError::NotFound("No refresh token available".to_string()));
        };

        let result: Result<JwtResponse, ClientError> = self
            .api
            .post("/auth/refresh", &RefreshRequest { refresh_token })
            .await;
        match result {
            Ok(fresh) => {
                let jwt = merge_refreshed(stored, fresh);
                self.store(&jwt)?;
                Ok(jwt)
            }
            Err(e) => {
                if ends_session(&e) {
                    warn!(error = %e, "Refresh rejected, signing out");
                    self.logout()?;
                }
                Err(e)
            }
        }
    }

    /// Forget the session and the guest cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if storage cannot be updated.
    pub fn logout(&self) -> Result<(), ClientError> {
        let storage = self.api.storage();
        storage.remove(keys::USER)?;
        storage.remove(keys::TOKEN)?;
        storage.remove(keys::GUEST_CART)?;
        info!("Signed out");
        Ok(())
    }

    /// `GET /users/me`
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the session is not valid.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        self.api.get("/users/me", &[]).await
    }

    fn store(&self, jwt: &JwtResponse) -> Result<(), ClientError> {
        let storage = self.api.storage();
        write_json(storage, keys::USER, jwt)?;
        storage.set(keys::TOKEN, &jwt.access_token)
    }
}

/// Fold a refresh answer into the stored user.
fn merge_refreshed(stored: Option<JwtResponse>, fresh: JwtResponse) -> JwtResponse {
    let refresh_token = fresh
        .refresh_token
        .or_else(|| stored.and_then(|user| user.refresh_token));
    JwtResponse {
        refresh_token,
        ..fresh
    }
}

/// Whether a failed refresh means the refresh token is no good.
const fn ends_session(e: &ClientError) -> bool {
    matches!(e, ClientError::Status { .. })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use dream_collections_core::UserId;

    use super::*;
    use crate::storage::MemoryStorage;

    fn session() -> AuthSession {
        AuthSession::new(ApiClient::new(
            "http://127.0.0.1:1/api",
            Arc::new(MemoryStorage::new()),
        ))
    }

    fn jwt() -> JwtResponse {
        JwtResponse {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_type: "Bearer".to_string(),
            id: UserId::new(5),
            username: "user_9876543210".to_string(),
            email: "9876543210@dreamcollections.com".to_string(),
            first_name: "Customer".to_string(),
            last_name: String::new(),
            phone_number: Some("+919876543210".to_string()),
            roles: vec!["ROLE_CUSTOMER".to_string()],
        }
    }

    #[test]
    fn test_authenticated_needs_token_and_user() {
        let session = session();
        assert!(!session.is_authenticated());

        session.api.storage().set(keys::TOKEN, "access").unwrap();
        assert!(!session.is_authenticated());

        session.store(&jwt()).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.current_user().unwrap().id, UserId::new(5));
        assert_eq!(session.token().as_deref(), Some("access"));
    }

    #[test]
    fn test_logout_clears_session_and_guest_cart() {
        let session = session();
        session.store(&jwt()).unwrap();
        session
            .api
            .storage()
            .set(keys::GUEST_CART, r#"{"items":[]}"#)
            .unwrap();
        session
            .api
            .storage()
            .set(keys::USER_ORDERS, "[]")
            .unwrap();

        session.logout().unwrap();

        let storage = session.api.storage();
        assert!(storage.get(keys::TOKEN).is_none());
        assert!(storage.get(keys::USER).is_none());
        assert!(storage.get(keys::GUEST_CART).is_none());
        assert!(storage.get(keys::USER_ORDERS).is_some());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails_locally() {
        let err = session().refresh().await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_signs_out() {
        let session = session();
        session
            .store(&JwtResponse {
                refresh_token: None,
                ..jwt()
            })
            .unwrap();

        let err = session.refresh().await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_unreachable_refresh_keeps_session() {
        let session = session();
        session.store(&jwt()).unwrap();

        let err = session.refresh().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_rejected_refresh_ends_session() {
        assert!(ends_session(&ClientError::Status {
            status: 401,
            message: "Invalid refresh token".to_string(),
        }));
        assert!(!ends_session(&ClientError::Storage("disk full".to_string())));
    }

    #[test]
    fn test_refresh_answer_replaces_user_but_keeps_refresh_token() {
        let fresh = JwtResponse {
            access_token: "access-2".to_string(),
            refresh_token: None,
            first_name: "Asha".to_string(),
            ..jwt()
        };
        let merged = merge_refreshed(Some(jwt()), fresh);
        assert_eq!(merged.access_token, "access-2");
        assert_eq!(merged.first_name, "Asha");
        assert_eq!(merged.refresh_token.as_deref(), Some("refresh"));

        let rotated = JwtResponse {
            refresh_token: Some("refresh-2".to_string()),
            ..jwt()
        };
        let merged = merge_refreshed(Some(jwt()), rotated);
        assert_eq!(merged.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_failed_login_stores_nothing() {
        let session = session();
        assert!(session.login("asha", "pw").await.is_err());
        assert!(!session.is_authenticated());
    }
}

//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Service errors convert into
//! `AppError` with `?`; the response is a JSON `MessageResponse` with
//! `success: false`. Server errors are captured to Sentry and their details
//! are never sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use dream_collections_core::api::MessageResponse;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;
use crate::services::otp::OtpError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Sign-up, sign-in or token failure.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// OTP send or verify failure.
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail(_)
        | AuthError::InvalidPhone(_)
        | AuthError::UsernameTaken
        | AuthError::EmailInUse
        | AuthError::PhoneInUse
        | AuthError::InvalidRole(_)
        | AuthError::Validation(_)
        | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::Repository(e) => repository_status(e),
        AuthError::TokenSigning(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn otp_status(err: &OtpError) -> StatusCode {
    match err {
        OtpError::InvalidPhone(_)
        | OtpError::InvalidEmail(_)
        | OtpError::InvalidFormat(_)
        | OtpError::NoActiveOtp
        | OtpError::AttemptsExceeded
        | OtpError::Expired
        | OtpError::Mismatch => StatusCode::BAD_REQUEST,
        OtpError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        OtpError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        OtpError::Auth(e) => auth_status(e),
        OtpError::Repository(e) => repository_status(e),
    }
}

impl AppError {
    /// The HTTP status this error is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) => repository_status(e),
            Self::Auth(e) => auth_status(e),
            Self::Otp(e) => otp_status(e),
            Self::Catalog(e) => match e {
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
                CatalogError::Conflict(_) => StatusCode::CONFLICT,
                CatalogError::Repository(e) => repository_status(e),
            },
            Self::Cart(e) => match e {
                CartError::NotFound(_) => StatusCode::NOT_FOUND,
                CartError::Invalid(_) | CartError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
                CartError::Repository(e) => repository_status(e),
            },
            Self::Order(e) => match e {
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::Repository(e) => repository_status(e),
                OrderError::EmptyCart
                | OrderError::VariantMissing(_)
                | OrderError::InsufficientStock { .. }
                | OrderError::InvalidTransition { .. }
                | OrderError::NotCancellable(_)
                | OrderError::Invalid(_) => StatusCode::BAD_REQUEST,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return INTERNAL_MESSAGE.to_string();
        }
        match self {
            // Never reveal whether the account exists
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound)
                if status == StatusCode::UNAUTHORIZED =>
            {
                "Invalid credentials".to_string()
            }
            Self::Auth(e) => auth_message(e),
            Self::Otp(OtpError::Auth(e)) => auth_message(e),
            Self::Otp(e) => e.to_string(),
            Self::Catalog(e) => e.to_string(),
            Self::Cart(e) => e.to_string(),
            Self::Order(e) => e.to_string(),
            Self::Database(RepositoryError::NotFound) => "Resource not found".to_string(),
            Self::Database(e) => e.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::RateLimited => "Too many requests. Please try again later.".to_string(),
        }
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => "Invalid credentials".to_string(),
        AuthError::UsernameTaken | AuthError::EmailInUse | AuthError::PhoneInUse => {
            format!("Error: {err}")
        }
        AuthError::InvalidToken(_) => "Invalid or expired token".to_string(),
        AuthError::WeakPassword(msg) | AuthError::Validation(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = MessageResponse::error(self.public_message(status));
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Placing order", Some(&[("payment_method", "COD")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use dream_collections_core::{OrderId, OrderStatus};

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, MessageResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_error_status_codes() {
        assert_eq!(
            AppError::from(OtpError::RateLimited).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::from(CatalogError::Conflict("in use".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(OrderError::NotFound(OrderId::new(3))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(OrderError::NotCancellable(OrderStatus::Shipped)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(RepositoryError::Conflict("dup".into())).status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_json_body_for_client_errors() {
        let (status, body) = body_of(OrderError::EmptyCart.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.message, "Cannot create order from an empty cart.");

        let (_, body) = body_of(AuthError::UsernameTaken.into()).await;
        assert_eq!(body.message, "Error: Username is already taken!");
    }

    #[tokio::test]
    async fn test_server_error_details_hidden() {
        let (status, body) =
            body_of(AppError::Internal("connection pool exhausted".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, INTERNAL_MESSAGE);

        let (_, body) = body_of(OtpError::Delivery("sms gateway down".into()).into()).await;
        assert_eq!(body.message, INTERNAL_MESSAGE);
    }
}

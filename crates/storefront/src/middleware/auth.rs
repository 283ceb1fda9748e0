//! Bearer-token extractors.
//!
//! Tokens are verified against the `TokenService` in `AppState`; the extracted
//! identity comes from the token claims alone, so no database round trip is
//! made per request.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use dream_collections_core::api::MessageResponse;

use crate::error::set_sentry_user;
use crate::models::AuthenticatedUser;
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_cart(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub AuthenticatedUser);

/// Extractor that requires a valid access token carrying `ROLE_ADMIN`.
pub struct RequireAdmin(pub AuthenticatedUser);

/// Extractor that optionally gets the caller.
///
/// A missing or invalid token yields `None` instead of rejecting the request.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

/// Why an authenticated route refused the request.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Bad signature, wrong issuer, wrong kind or expired.
    InvalidToken,
    /// Authenticated, but not an admin.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "Full authentication is required"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access denied"),
        };
        (status, Json(MessageResponse::error(message))).into_response()
    }
}

/// The token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthenticatedUser, AuthRejection> {
    let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;
    let claims = state.tokens().verify_access(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AuthRejection::InvalidToken
    })?;
    let user = claims.identity();
    tracing::Span::current().record("user_id", user.id.as_i32());
    set_sentry_user(&user.id, &user.username);
    Ok(user)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state)?;
        if !user.is_admin() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state).ok()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/carts/mine");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic dXNlcg=="))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            AuthRejection::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}

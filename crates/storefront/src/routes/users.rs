//! Account profile handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use dream_collections_core::UserId;
use dream_collections_core::api::UserProfile;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// `GET /api/users/me`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>> {
    let account = AuthService::new(state.pool(), state.tokens())
        .get_user(user.id)
        .await
        .map_err(|e| match e {
            // Token outlived its account
            AuthError::UserNotFound => AppError::Unauthorized("Account no longer exists".into()),
            other => other.into(),
        })?;
    Ok(Json(account.profile()))
}

/// `GET /api/users/{id}`
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>> {
    let account = AuthService::new(state.pool(), state.tokens())
        .get_user(id)
        .await
        .map_err(|e| match e {
            AuthError::UserNotFound => AppError::NotFound(format!("User not found with id: {id}")),
            other => other.into(),
        })?;
    Ok(Json(account.profile()))
}

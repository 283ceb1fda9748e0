//! Category handlers.
//!
//! Reads are public and served from the cached category list. Writes need an
//! admin token.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use dream_collections_core::CategoryId;
use dream_collections_core::api::{CategoryRequest, CategoryResponse, MessageResponse};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::services::catalog::CatalogService;
use crate::state::AppState;

fn catalog(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.pool(), state.categories())
}

/// `GET /api/categories` and `GET /api/categories/toplevel`
#[instrument(skip(state))]
pub async fn tree(State(state): State<AppState>) -> Result<Json<Vec<CategoryResponse>>> {
    Ok(Json(catalog(&state).category_tree().await?))
}

/// `GET /api/categories/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<CategoryResponse>> {
    Ok(Json(catalog(&state).category(id).await?))
}

/// `GET /api/categories/name/{name}`
#[instrument(skip(state))]
pub async fn by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CategoryResponse>> {
    Ok(Json(catalog(&state).category_by_name(&name).await?))
}

/// `GET /api/categories/{id}/subcategories`
#[instrument(skip(state))]
pub async fn subcategories(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Vec<CategoryResponse>>> {
    Ok(Json(catalog(&state).subcategories(id).await?))
}

/// `POST /api/categories`
#[instrument(skip(state, _admin, req), fields(name = %req.name))]
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    let created = catalog(&state).create_category(&req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/categories/{id}`
#[instrument(skip(state, _admin, req))]
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>> {
    Ok(Json(catalog(&state).update_category(id, &req).await?))
}

/// `DELETE /api/categories/{id}`
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<MessageResponse>> {
    catalog(&state).delete_category(id).await?;
    Ok(Json(MessageResponse::ok("Category deleted successfully")))
}

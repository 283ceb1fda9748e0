//! Server-side cart handlers.
//!
//! Every mutation answers with the recomputed cart so the client can replace
//! its copy wholesale.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use dream_collections_core::api::{
    AddCartItemRequest, CartView, MessageResponse, UpdateCartItemRequest,
};
use dream_collections_core::{UserId, VariantId};

use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::cart::CartService;
use crate::state::AppState;

/// `GET /api/carts/mine`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(state.pool()).view(user.id).await?))
}

/// `POST /api/carts/mine/items`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<AddCartItemRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .add(user.id, req.product_variant_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// `PUT /api/carts/mine/items/{variantId}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(variant): Path<VariantId>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .update(user.id, variant, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// `DELETE /api/carts/mine/items/{variantId}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(variant): Path<VariantId>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool()).remove(user.id, variant).await?;
    Ok(Json(cart))
}

/// `DELETE /api/carts/mine`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MessageResponse>> {
    CartService::new(state.pool()).clear(user.id).await?;
    Ok(Json(MessageResponse::ok("Cart cleared successfully")))
}

/// `GET /api/carts/user/{userId}`
#[instrument(skip(state, _admin))]
pub async fn for_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user): Path<UserId>,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(state.pool()).view_for(user).await?))
}

//! Customer order handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use dream_collections_core::OrderId;
use dream_collections_core::api::{CreateOrderRequest, OrderResponse, OrderStats, Page};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::PageRequest;
use crate::services::orders::OrderService;
use crate::state::AppState;

/// `POST /api/orders`
///
/// Turns the caller's cart into an order.
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    add_breadcrumb(
        "checkout",
        "Placing order",
        Some(&[("payment_method", req.payment_method.as_str())]),
    );
    let order = OrderService::new(state.pool()).place(&user, &req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders/my-orders`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<OrderResponse>>> {
    Ok(Json(OrderService::new(state.pool()).my_orders(user.id, page).await?))
}

/// `GET /api/orders/stats`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OrderStats>> {
    Ok(Json(OrderService::new(state.pool()).stats(user.id).await?))
}

/// `GET /api/orders/{id}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    Ok(Json(OrderService::new(state.pool()).order_for(&user, id).await?))
}

/// `PUT /api/orders/{id}/cancel`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    Ok(Json(OrderService::new(state.pool()).cancel(&user, id).await?))
}

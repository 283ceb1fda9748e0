//! Admin order workflow: listing, detail, status changes and notes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use dream_collections_core::api::{
    AdminNoteRequest, AdminOrderDetail, AdminOrderSummary, Page, UpdateOrderStatusRequest,
};
use dream_collections_core::{OrderId, OrderStatus, UserId};

use crate::db::orders::OrderFilter;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::services::orders::OrderService;
use crate::services::{DEFAULT_PAGE_SIZE, PageRequest};
use crate::state::AppState;

/// `?page&size&status&userId`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
}

impl AdminOrderQuery {
    fn split(&self) -> (OrderFilter, PageRequest) {
        (
            OrderFilter {
                status: self.status,
                user_id: self.user_id,
            },
            PageRequest {
                page: self.page.unwrap_or(0),
                size: self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            },
        )
    }
}

/// `GET /api/admin/orders`
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<Page<AdminOrderSummary>>> {
    let (filter, page) = query.split();
    Ok(Json(OrderService::new(state.pool()).admin_list(filter, page).await?))
}

/// `GET /api/admin/orders/{id}`
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<AdminOrderDetail>> {
    Ok(Json(OrderService::new(state.pool()).admin_detail(id).await?))
}

/// `PUT /api/admin/orders/{id}/status`
#[instrument(skip(state, admin, req), fields(admin = %admin.username, new_status = %req.new_status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<AdminOrderDetail>> {
    let detail = OrderService::new(state.pool())
        .update_status(&admin, id, req.new_status, req.notes.as_deref())
        .await?;
    Ok(Json(detail))
}

/// `POST /api/admin/orders/{id}/notes`
#[instrument(skip(state, admin, req), fields(admin = %admin.username))]
pub async fn add_note(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(req): Json<AdminNoteRequest>,
) -> Result<Json<AdminOrderDetail>> {
    let detail = OrderService::new(state.pool())
        .add_note(&admin, id, &req.note_text)
        .await?;
    Ok(Json(detail))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_split() {
        let uri: axum::http::Uri = "/api/admin/orders?status=SHIPPED&userId=9&size=10"
            .parse()
            .unwrap();
        let Query(query) = Query::<AdminOrderQuery>::try_from_uri(&uri).unwrap();
        let (filter, page) = query.split();
        assert_eq!(filter.status, Some(OrderStatus::Shipped));
        assert_eq!(filter.user_id, Some(UserId::new(9)));
        assert_eq!(page.page, 0);
        assert_eq!(page.size(), 10);
    }
}

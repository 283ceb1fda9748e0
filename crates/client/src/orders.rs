//! Checkout and order history with a local fallback.
//!
//! Orders go to the server first. When it cannot take them the order is kept
//! in storage under `userOrders` as a [`GuestOrder`], and history, lookup,
//! cancellation and stats read from there instead.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use dream_collections_core::api::{Address, CreateOrderRequest, OrderResponse, OrderStats, Page};
use dream_collections_core::{OrderStatus, VariantId};

use crate::api::ApiClient;
use crate::auth::is_authenticated;
use crate::error::ClientError;
use crate::storage::{keys, read_json, write_json};

/// Every order ships within India.
pub const SHIPPING_COUNTRY: &str = "India";

/// One purchased line, as carried into checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestOrderItem {
    pub product_variant_id: VariantId,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i32,
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// What the shopper fills in at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub payment_method: String,
    /// Only kept on a local order; the server prices its own cart.
    pub items: Vec<GuestOrderItem>,
    pub total_amount: Decimal,
}

impl CheckoutDetails {
    fn shipping_address(&self, contact_phone: Option<String>) -> Address {
        Address {
            street: self.address.clone(),
            address_line2: None,
            city: self.city.clone(),
            state_or_province: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: SHIPPING_COUNTRY.to_string(),
            contact_phone,
        }
    }

    fn to_request(&self) -> CreateOrderRequest {
        CreateOrderRequest {
            shipping_address: self.shipping_address(Some(self.customer_phone.clone())),
            billing_address: None,
            customer_email: self.customer_email.clone(),
            customer_name_snapshot: Some(self.customer_name.clone()),
            customer_phone: Some(self.customer_phone.clone()),
            payment_method: self.payment_method.clone(),
            shipping_method: None,
        }
    }
}

/// An order kept only in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestOrder {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub shipping_address: Address,
    pub payment_method: String,
    #[serde(default)]
    pub items: Vec<GuestOrderItem>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An order from the server or from local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRecord {
    Remote(OrderResponse),
    Guest(GuestOrder),
}

impl OrderRecord {
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Remote(order) => order.id.to_string(),
            Self::Guest(order) => order.id.clone(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        match self {
            Self::Remote(order) => order.status,
            Self::Guest(order) => order.status,
        }
    }

    #[must_use]
    pub const fn total_amount(&self) -> Decimal {
        match self {
            Self::Remote(order) => order.total_amount,
            Self::Guest(order) => order.total_amount,
        }
    }
}

/// Order history from the server or from local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderHistory {
    Remote(Page<OrderResponse>),
    Guest(Vec<GuestOrder>),
}

impl OrderHistory {
    /// Flatten into records, newest server page order preserved.
    #[must_use]
    pub fn into_records(self) -> Vec<OrderRecord> {
        match self {
            Self::Remote(page) => page.content.into_iter().map(OrderRecord::Remote).collect(),
            Self::Guest(orders) => orders.into_iter().map(OrderRecord::Guest).collect(),
        }
    }
}

/// `<unix millis><random below one million>`
fn generate_order_id(now: DateTime<Utc>) -> String {
    let random = rand::rng().random_range(0..1_000_000);
    format!("{}{random}", now.timestamp_millis())
}

/// Order operations with local fallback.
#[derive(Debug, Clone)]
pub struct OrderService {
    api: ApiClient,
}

impl OrderService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Place an order from the server cart, or keep it locally.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the local order cannot be saved.
    #[instrument(skip(self, details), fields(payment_method = %details.payment_method))]
    pub async fn create_order(&self, details: &CheckoutDetails) -> Result<OrderRecord, ClientError> {
        match self
            .api
            .post::<_, OrderResponse>("/orders", &details.to_request())
            .await
        {
            Ok(order) => {
                info!(order_id = %order.id, "Order placed");
                Ok(OrderRecord::Remote(order))
            }
            Err(e) => {
                warn!(error = %e, "Failed to place order, keeping it locally");
                self.create_guest_order(details).map(OrderRecord::Guest)
            }
        }
    }

    /// The first page of the shopper's orders, or the local orders.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> OrderHistory {
        match self.api.get("/orders/my-orders", &[]).await {
            Ok(page) => OrderHistory::Remote(page),
            Err(e) => {
                warn!(error = %e, "Failed to fetch orders, using local orders");
                OrderHistory::Guest(self.guest_orders())
            }
        }
    }

    /// One order by id.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if neither the server nor local
    /// storage has it.
    #[instrument(skip(self))]
    pub async fn order_by_id(&self, id: &str) -> Result<OrderRecord, ClientError> {
        match self.api.get(&format!("/orders/{id}"), &[]).await {
            Ok(order) => Ok(OrderRecord::Remote(order)),
            Err(e) => {
                warn!(error = %e, "Failed to fetch order, checking local orders");
                self.guest_order(id).map(OrderRecord::Guest)
            }
        }
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the server refused and no local
    /// order has this id.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: &str) -> Result<OrderRecord, ClientError> {
        if is_authenticated(self.api.storage()) {
            match self
                .api
                .put_empty::<OrderResponse>(&format!("/orders/{id}/cancel"))
                .await
            {
                Ok(order) => return Ok(OrderRecord::Remote(order)),
                Err(e) => warn!(error = %e, "Failed to cancel order, checking local orders"),
            }
        }
        self.cancel_guest_order(id).map(OrderRecord::Guest)
    }

    /// Order totals; all zeros when they cannot be worked out.
    #[instrument(skip(self))]
    pub async fn order_stats(&self) -> OrderStats {
        if !is_authenticated(self.api.storage()) {
            return guest_stats(&self.guest_orders());
        }
        match self.api.get("/orders/stats", &[]).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Failed to fetch order stats");
                OrderStats::default()
            }
        }
    }

    /// Locally kept orders, oldest first.
    #[must_use]
    pub fn guest_orders(&self) -> Vec<GuestOrder> {
        read_json(self.api.storage(), keys::USER_ORDERS).unwrap_or_default()
    }

    /// Forget all locally kept orders.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if storage cannot be updated.
    pub fn clear_guest_orders(&self) -> Result<(), ClientError> {
        self.api.storage().remove(keys::USER_ORDERS)
    }

    fn save_guest_orders(&self, orders: &[GuestOrder]) -> Result<(), ClientError> {
        write_json(self.api.storage(), keys::USER_ORDERS, &orders)
    }

    fn create_guest_order(&self, details: &CheckoutDetails) -> Result<GuestOrder, ClientError> {
        let now = Utc::now();
        let order = GuestOrder {
            id: generate_order_id(now),
            customer_name: details.customer_name.clone(),
            customer_phone: details.customer_phone.clone(),
            customer_email: details.customer_email.clone(),
            shipping_address: details.shipping_address(None),
            payment_method: details.payment_method.clone(),
            items: details.items.clone(),
            total_amount: details.total_amount,
            status: OrderStatus::Confirmed,
            order_date: now,
            created_at: now,
            updated_at: None,
        };

        let mut orders = self.guest_orders();
        orders.push(order.clone());
        self.save_guest_orders(&orders)?;
        info!(order_id = %order.id, "Order kept locally");
        Ok(order)
    }

    fn guest_order(&self, id: &str) -> Result<GuestOrder, ClientError> {
        self.guest_orders()
            .into_iter()
            .find(|order| order.id == id)
            .ok_or_else(|| ClientError::NotFound("Order not found".to_string()))
    }

    fn cancel_guest_order(&self, id: &str) -> Result<GuestOrder, ClientError> {
        let mut orders = self.guest_orders();
        let order = orders
            .iter_mut()
            .find(|order| order.id == id)
            .ok_or_else(|| ClientError::NotFound("Order not found".to_string()))?;
        order.status = OrderStatus::Cancelled;
        order.updated_at = Some(Utc::now());
        let cancelled = order.clone();
        self.save_guest_orders(&orders)?;
        Ok(cancelled)
    }
}

/// Totals over local orders. Local orders are `CONFIRMED` until cancelled.
fn guest_stats(orders: &[GuestOrder]) -> OrderStats {
    let count = |status: OrderStatus| {
        let n = orders.iter().filter(|order| order.status == status).count();
        i64::try_from(n).unwrap_or(i64::MAX)
    };
    OrderStats {
        total_orders: i64::try_from(orders.len()).unwrap_or(i64::MAX),
        total_amount: orders.iter().map(|order| order.total_amount).sum(),
        pending_orders: count(OrderStatus::PendingPayment),
        completed_orders: count(OrderStatus::Confirmed),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStorage;

    fn service() -> OrderService {
        OrderService::new(ApiClient::new(
            "http://127.0.0.1:1/api",
            Arc::new(MemoryStorage::new()),
        ))
    }

    fn details(total: i64) -> CheckoutDetails {
        CheckoutDetails {
            customer_name: "Asha Rao".to_string(),
            customer_phone: "9876543210".to_string(),
            customer_email: None,
            address: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "560001".to_string(),
            payment_method: "COD".to_string(),
            items: vec![GuestOrderItem {
                product_variant_id: VariantId::new(11),
                product_name: Some("Temple Jhumkas".to_string()),
                quantity: 1,
                price: Some(Decimal::new(total, 2)),
            }],
            total_amount: Decimal::new(total, 2),
        }
    }

    #[test]
    fn test_order_request_shape() {
        let request = details(249_900).to_request();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["shippingAddress"]["country"], "India");
        assert_eq!(json["shippingAddress"]["contactPhone"], "9876543210");
        assert_eq!(json["customerNameSnapshot"], "Asha Rao");
        assert!(json["billingAddress"].is_null());
    }

    #[test]
    fn test_generated_id_starts_with_millis() {
        let now = Utc::now();
        let id = generate_order_id(now);
        assert!(id.starts_with(&now.timestamp_millis().to_string()));
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_unreachable_server_keeps_order_locally() {
        let service = service();
        let placed = service.create_order(&details(249_900)).await.unwrap();

        let OrderRecord::Guest(order) = &placed else {
            panic!("expected local order");
        };
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.shipping_address.country, SHIPPING_COUNTRY);
        assert!(order.updated_at.is_none());

        let found = service.order_by_id(&placed.id()).await.unwrap();
        assert_eq!(found, placed);

        let history = service.my_orders().await.into_records();
        assert_eq!(history, vec![placed]);
    }

    #[tokio::test]
    async fn test_cancel_local_order() {
        let service = service();
        let placed = service.create_order(&details(99_900)).await.unwrap();

        let cancelled = service.cancel_order(&placed.id()).await.unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        let OrderRecord::Guest(order) = cancelled else {
            panic!("expected local order");
        };
        assert!(order.updated_at.is_some());
        assert_eq!(
            service.guest_orders().first().map(|o| o.status),
            Some(OrderStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let service = service();
        let err = service.order_by_id("42").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref m) if m == "Order not found"));
        assert!(service.cancel_order("42").await.is_err());
    }

    #[tokio::test]
    async fn test_guest_stats() {
        let service = service();
        service.create_order(&details(100_000)).await.unwrap();
        let second = service.create_order(&details(50_050)).await.unwrap();
        service.cancel_order(&second.id()).await.unwrap();

        let stats = service.order_stats().await;
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_amount, Decimal::new(150_050, 2));
        assert_eq!(stats.pending_orders, 0);
        assert_eq!(stats.completed_orders, 1);

        service.clear_guest_orders().unwrap();
        assert_eq!(service.order_stats().await.total_orders, 0);
    }

    #[tokio::test]
    async fn test_signed_in_stats_fall_back_to_zero() {
        let service = service();
        service.create_order(&details(100_000)).await.unwrap();
        service.api.storage().set(keys::TOKEN, "access").unwrap();
        service.api.storage().set(keys::USER, "{}").unwrap();

        let stats = service.order_stats().await;
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_amount, Decimal::ZERO);
    }
}

//! Checkout and order bodies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderItemId, OrderStatus, PaymentStatus, UserId, VariantId};

/// Postal address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state_or_province: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

/// `POST /api/orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: Address,
    /// Defaults to the shipping address.
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default, alias = "customerName")]
    pub customer_name_snapshot: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub shipping_method: Option<String>,
}

/// A line of a placed order, priced as it was at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_variant_id: VariantId,
    pub product_name: String,
    pub variant_size: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub subtotal: Decimal,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: String,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub payment_transaction_id: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLogEntry {
    #[serde(default)]
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub changed_by: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Order with its status history, for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderDetail {
    #[serde(flatten)]
    pub order: OrderResponse,
    #[serde(default)]
    pub status_history: Vec<StatusLogEntry>,
}

/// One row of the admin order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderSummary {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub item_count: i64,
}

/// `PUT /api/admin/orders/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub new_status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// `POST /api/admin/orders/{id}/notes`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminNoteRequest {
    pub note_text: String,
}

/// Order counters for the signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_amount: Decimal,
    pub pending_orders: i64,
    pub completed_orders: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_accepts_customer_name_alias() {
        let json = r#"{
            "customerName": "Asha",
            "customerPhone": "+919876543210",
            "shippingAddress": {
                "street": "12 MG Road",
                "city": "Bengaluru",
                "stateOrProvince": "Karnataka",
                "postalCode": "560001",
                "country": "India",
                "contactPhone": "+919876543210"
            },
            "billingAddress": null,
            "paymentMethod": "COD"
        }"#;
        let parsed: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.customer_name_snapshot.as_deref(), Some("Asha"));
        assert!(parsed.billing_address.is_none());
        assert_eq!(parsed.shipping_address.city, "Bengaluru");
    }

    #[test]
    fn test_status_update_body() {
        let parsed: UpdateOrderStatusRequest =
            serde_json::from_str(r#"{"newStatus":"SHIPPED","notes":"AWB 123"}"#).unwrap();
        assert_eq!(parsed.new_status, OrderStatus::Shipped);
    }
}

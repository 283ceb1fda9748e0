//! Order rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use dream_collections_core::api::{
    Address, AdminOrderSummary, OrderItemResponse, OrderResponse, StatusLogEntry,
};
use dream_collections_core::{OrderId, OrderItemId, OrderStatus, PaymentStatus, UserId, VariantId};

/// An order header. Addresses are stored flattened.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_street: String,
    pub shipping_address_line2: Option<String>,
    pub shipping_city: String,
    pub shipping_state_or_province: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,
    pub shipping_contact_phone: Option<String>,
    pub billing_street: String,
    pub billing_address_line2: Option<String>,
    pub billing_city: String,
    pub billing_state_or_province: String,
    pub billing_postal_code: String,
    pub billing_country: String,
    pub billing_contact_phone: Option<String>,
    pub payment_method: String,
    pub shipping_method: Option<String>,
    pub tracking_number: Option<String>,
    pub payment_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_variant_id: VariantId,
    pub product_name: String,
    pub variant_size: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderStatusLog {
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub changed_by: String,
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn shipping_address(&self) -> Address {
        Address {
            street: self.shipping_street.clone(),
            address_line2: self.shipping_address_line2.clone(),
            city: self.shipping_city.clone(),
            state_or_province: self.shipping_state_or_province.clone(),
            postal_code: self.shipping_postal_code.clone(),
            country: self.shipping_country.clone(),
            contact_phone: self.shipping_contact_phone.clone(),
        }
    }

    #[must_use]
    pub fn billing_address(&self) -> Address {
        Address {
            street: self.billing_street.clone(),
            address_line2: self.billing_address_line2.clone(),
            city: self.billing_city.clone(),
            state_or_province: self.billing_state_or_province.clone(),
            postal_code: self.billing_postal_code.clone(),
            country: self.billing_country.clone(),
            contact_phone: self.billing_contact_phone.clone(),
        }
    }

    /// Combine the header with its lines.
    #[must_use]
    pub fn into_response(self, items: Vec<OrderItem>) -> OrderResponse {
        let shipping_address = self.shipping_address();
        let billing_address = self.billing_address();
        OrderResponse {
            id: self.id,
            user_id: self.user_id,
            customer_email: self.customer_email,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            status: self.status,
            payment_status: self.payment_status,
            total_amount: self.total_amount,
            shipping_address,
            billing_address,
            payment_method: self.payment_method,
            shipping_method: self.shipping_method,
            tracking_number: self.tracking_number,
            payment_transaction_id: self.payment_transaction_id,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    #[must_use]
    pub fn summary(&self, item_count: i64) -> AdminOrderSummary {
        AdminOrderSummary {
            id: self.id,
            user_id: self.user_id,
            customer_email: self.customer_email.clone(),
            customer_name: self.customer_name.clone(),
            order_date: self.created_at,
            total_amount: self.total_amount,
            status: self.status,
            item_count,
        }
    }
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_variant_id: item.product_variant_id,
            subtotal: item.price_at_purchase * Decimal::from(item.quantity),
            product_name: item.product_name,
            variant_size: item.variant_size,
            image_url: item.image_url,
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase,
        }
    }
}

impl From<OrderStatusLog> for StatusLogEntry {
    fn from(log: OrderStatusLog) -> Self {
        Self {
            previous_status: log.previous_status,
            new_status: log.new_status,
            changed_by: log.changed_by,
            notes: log.notes,
            changed_at: log.changed_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_item_subtotal() {
        let item = OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(1),
            product_variant_id: VariantId::new(3),
            product_name: "Classic Diamond Solitaire Ring".to_owned(),
            variant_size: "6".to_owned(),
            image_url: None,
            quantity: 3,
            price_at_purchase: Decimal::new(4_999_900, 2),
        };
        let response = OrderItemResponse::from(item);
        assert_eq!(response.subtotal, Decimal::new(14_999_700, 2));
    }
}

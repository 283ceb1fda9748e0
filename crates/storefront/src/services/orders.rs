//! Orders: checkout from the server cart, customer history, and the admin
//! status workflow.
//!
//! Checkout runs in one transaction: the cart and its lines are locked, stock is
//! taken with a guarded decrement, the order and its lines are written and
//! the cart is emptied. A failure anywhere rolls all of it back.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use dream_collections_core::api::{
    Address, AdminOrderDetail, AdminOrderSummary, CreateOrderRequest, OrderResponse, OrderStats,
    Page, StatusLogEntry,
};
use dream_collections_core::{OrderId, OrderStatus, UserId, VariantId};

use super::PageRequest;
use crate::db::carts;
use crate::db::orders::{self, CheckoutLine, NewOrder, OrderFilter};
use crate::db::{OrderRepository, RepositoryError, UserRepository};
use crate::models::{AuthenticatedUser, Order, OrderItem};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Cannot create order from an empty cart.")]
    EmptyCart,

    #[error("Details for product variant ID {0} not found. Order cannot be processed.")]
    VariantMissing(VariantId),

    #[error("Insufficient stock for product: {name} ({size}).")]
    InsufficientStock { name: String, size: String },

    #[error("Order not found with id: {0}")]
    NotFound(OrderId),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order cannot be cancelled in status {0}")]
    NotCancellable(OrderStatus),

    #[error("{0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

pub struct OrderService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// Turn the caller's cart into an order awaiting payment.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart`, `VariantMissing` or
    /// `InsufficientStock` when the cart cannot be fulfilled, `Invalid` for an
    /// incomplete address or missing payment method.
    #[instrument(skip(self, user, req), fields(user_id = %user.id))]
    pub async fn place(
        &self,
        user: &AuthenticatedUser,
        req: &CreateOrderRequest,
    ) -> Result<OrderResponse, OrderError> {
        validate_address(&req.shipping_address, "Shipping")?;
        if let Some(billing) = &req.billing_address {
            validate_address(billing, "Billing")?;
        }
        let payment_method = req.payment_method.trim();
        if payment_method.is_empty() {
            return Err(OrderError::Invalid("Payment method is required".to_owned()));
        }

        let account = self.users.get_by_id(user.id).await?;
        let customer_email = non_blank(req.customer_email.as_deref())
            .map(str::to_owned)
            .or_else(|| account.as_ref().map(|u| u.email.to_string()));
        let customer_name = non_blank(req.customer_name_snapshot.as_deref())
            .map(str::to_owned)
            .or_else(|| {
                account
                    .as_ref()
                    .map(|u| format!("{} {}", u.first_name, u.last_name).trim().to_owned())
            });
        let customer_phone = non_blank(req.customer_phone.as_deref())
            .map(str::to_owned)
            .or_else(|| {
                account
                    .as_ref()
                    .and_then(|u| u.phone_number.as_ref().map(ToString::to_string))
            });

        let mut tx = self.pool.begin().await?;
        let cart = carts::lock_cart(&mut *tx, user.id).await?;

        let lines = orders::lock_cart_lines(&mut *tx, cart).await?;
        let total_amount = checkout_total(&lines)?;

        let order = orders::insert_order(
            &mut *tx,
            &NewOrder {
                user_id: user.id,
                customer_email: customer_email.as_deref(),
                customer_name: customer_name.as_deref(),
                customer_phone: customer_phone.as_deref(),
                total_amount,
                shipping: &req.shipping_address,
                billing: req.billing_address.as_ref().unwrap_or(&req.shipping_address),
                payment_method,
                shipping_method: non_blank(req.shipping_method.as_deref()),
            },
        )
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            if !orders::decrement_stock(&mut *tx, line.product_variant_id, line.quantity).await? {
                return Err(insufficient(line));
            }
            items.push(orders::insert_item(&mut *tx, order.id, line).await?);
        }

        orders::insert_status_log(
            &mut *tx,
            order.id,
            None,
            order.status,
            &user.username,
            Some("Order placed"),
        )
        .await?;
        carts::clear(&mut *tx, cart).await?;
        carts::touch(&mut *tx, cart).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, total = %order.total_amount, "Order placed");
        Ok(order.into_response(items))
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the lookup fails.
    pub async fn my_orders(
        &self,
        user: UserId,
        page: PageRequest,
    ) -> Result<Page<OrderResponse>, OrderError> {
        let (headers, total) = self
            .orders
            .list_for_user(user, page.limit(), page.offset())
            .await?;
        let mut items = self.items_by_order(&headers).await?;
        let content = headers
            .into_iter()
            .map(|o| {
                let lines = items.remove(&o.id).unwrap_or_default();
                o.into_response(lines)
            })
            .collect();
        Ok(Page::new(content, page.page, page.size(), total))
    }

    /// One of the caller's orders. Admins may read any order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs
    /// to someone else.
    pub async fn order_for(
        &self,
        user: &AuthenticatedUser,
        id: OrderId,
    ) -> Result<OrderResponse, OrderError> {
        let order = self.load(id).await?;
        if order.user_id != user.id && !user.is_admin() {
            return Err(OrderError::NotFound(id));
        }
        let items = self.orders.items_for(&[id]).await?;
        Ok(order.into_response(items))
    }

    /// Cancel one of the caller's unpaid orders and put the stock back.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for someone else's order and
    /// `NotCancellable` once payment has been taken.
    #[instrument(skip(self, user), fields(user_id = %user.id, order_id = %id))]
    pub async fn cancel(
        &self,
        user: &AuthenticatedUser,
        id: OrderId,
    ) -> Result<OrderResponse, OrderError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(&mut *tx, id)
            .await
            .map_err(|e| not_found_as(e, id))?;
        if order.user_id != user.id {
            return Err(OrderError::NotFound(id));
        }
        if !order.status.is_customer_cancellable() {
            return Err(OrderError::NotCancellable(order.status));
        }

        let items = orders::items_of(&mut *tx, id).await?;
        for item in &items {
            orders::restock(&mut *tx, item.product_variant_id, item.quantity).await?;
        }
        let updated = orders::set_status(&mut *tx, id, OrderStatus::Cancelled).await?;
        orders::insert_status_log(
            &mut *tx,
            id,
            Some(order.status),
            OrderStatus::Cancelled,
            &user.username,
            Some("Cancelled by customer"),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Order cancelled by customer");
        Ok(updated.into_response(items))
    }

    /// Counters over the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn stats(&self, user: UserId) -> Result<OrderStats, OrderError> {
        Ok(self.orders.stats_for_user(user).await?)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the lookup fails.
    pub async fn admin_list(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<AdminOrderSummary>, OrderError> {
        let (headers, total) = self
            .orders
            .list(filter, page.limit(), page.offset())
            .await?;
        let items = self.items_by_order(&headers).await?;
        let content = headers
            .iter()
            .map(|o| {
                let count = items.get(&o.id).map_or(0, Vec::len);
                o.summary(i64::try_from(count).unwrap_or(i64::MAX))
            })
            .collect();
        Ok(Page::new(content, page.page, page.size(), total))
    }

    /// An order with its full status history.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    pub async fn admin_detail(&self, id: OrderId) -> Result<AdminOrderDetail, OrderError> {
        let order = self.load(id).await?;
        let items = self.orders.items_for(&[id]).await?;
        let status_history = self
            .orders
            .status_history(id)
            .await?
            .into_iter()
            .map(StatusLogEntry::from)
            .collect();
        Ok(AdminOrderDetail {
            order: order.into_response(items),
            status_history,
        })
    }

    /// Move an order along the status workflow.
    ///
    /// Setting the current status again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the workflow does not allow it.
    #[instrument(skip(self, admin, notes), fields(order_id = %id, to = %new_status))]
    pub async fn update_status(
        &self,
        admin: &AuthenticatedUser,
        id: OrderId,
        new_status: OrderStatus,
        notes: Option<&str>,
    ) -> Result<AdminOrderDetail, OrderError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(&mut *tx, id)
            .await
            .map_err(|e| not_found_as(e, id))?;

        if order.status == new_status {
            tx.rollback().await?;
            return self.admin_detail(id).await;
        }
        if !order.status.can_transition_to(new_status) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }

        orders::set_status(&mut *tx, id, new_status).await?;
        let default_note = format!("Status changed by admin: {}", admin.username);
        orders::insert_status_log(
            &mut *tx,
            id,
            Some(order.status),
            new_status,
            &admin.username,
            Some(non_blank(notes).unwrap_or(default_note.as_str())),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(from = %order.status, "Order status updated");
        self.admin_detail(id).await
    }

    /// Attach a note to an order's history without changing its status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Invalid` for an empty note and `NotFound` for an
    /// unknown order.
    #[instrument(skip(self, admin, note), fields(order_id = %id))]
    pub async fn add_note(
        &self,
        admin: &AuthenticatedUser,
        id: OrderId,
        note: &str,
    ) -> Result<AdminOrderDetail, OrderError> {
        let note = non_blank(Some(note))
            .ok_or_else(|| OrderError::Invalid("Note text cannot be empty".to_owned()))?;
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(&mut *tx, id)
            .await
            .map_err(|e| not_found_as(e, id))?;
        orders::insert_status_log(
            &mut *tx,
            id,
            Some(order.status),
            order.status,
            &admin.username,
            Some(&format!("Admin Note: {note}")),
        )
        .await?;
        tx.commit().await?;
        self.admin_detail(id).await
    }

    async fn load(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders.get(id).await?.ok_or(OrderError::NotFound(id))
    }

    async fn items_by_order(
        &self,
        headers: &[Order],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, OrderError> {
        if headers.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<OrderId> = headers.iter().map(|o| o.id).collect();
        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in self.orders.items_for(&ids).await? {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }
}

/// Validate the locked cart lines and price them at current product prices.
fn checkout_total(lines: &[CheckoutLine]) -> Result<Decimal, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }
    let mut total = Decimal::ZERO;
    for line in lines {
        let (Some(price), Some(stock)) = (line.price, line.stock_quantity) else {
            return Err(OrderError::VariantMissing(line.product_variant_id));
        };
        if stock < line.quantity {
            return Err(insufficient(line));
        }
        total += price * Decimal::from(line.quantity);
    }
    Ok(total)
}

fn insufficient(line: &CheckoutLine) -> OrderError {
    OrderError::InsufficientStock {
        name: line.product_name.clone().unwrap_or_default(),
        size: line.size.clone().unwrap_or_default(),
    }
}

fn validate_address(address: &Address, which: &str) -> Result<(), OrderError> {
    let required = [
        ("street", &address.street),
        ("city", &address.city),
        ("state or province", &address.state_or_province),
        ("postal code", &address.postal_code),
        ("country", &address.country),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(OrderError::Invalid(format!("{which} address {field} is required")));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn not_found_as(e: RepositoryError, id: OrderId) -> OrderError {
    match e {
        RepositoryError::NotFound => OrderError::NotFound(id),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(variant: i32, qty: i32, stock: Option<i32>, price: Option<Decimal>) -> CheckoutLine {
        CheckoutLine {
            product_variant_id: VariantId::new(variant),
            quantity: qty,
            stock_quantity: stock,
            product_name: stock.map(|_| "Pearl Drop Earrings".to_owned()),
            size: stock.map(|_| "One Size".to_owned()),
            image_url: None,
            price,
        }
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert!(matches!(checkout_total(&[]), Err(OrderError::EmptyCart)));
    }

    #[test]
    fn test_total_uses_current_prices() {
        let lines = [
            line(1, 2, Some(5), Some(Decimal::new(1_599_900, 2))),
            line(2, 1, Some(1), Some(Decimal::new(899_900, 2))),
        ];
        assert_eq!(checkout_total(&lines).unwrap(), Decimal::new(4_099_700, 2));
    }

    #[test]
    fn test_missing_variant_message() {
        let err = checkout_total(&[line(9, 1, None, None)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Details for product variant ID 9 not found. Order cannot be processed."
        );
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = checkout_total(&[line(1, 3, Some(2), Some(Decimal::ONE))]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product: Pearl Drop Earrings (One Size)."
        );
    }

    #[test]
    fn test_address_validation() {
        let mut address = Address {
            street: "12 MG Road".to_owned(),
            city: "Bengaluru".to_owned(),
            state_or_province: "Karnataka".to_owned(),
            postal_code: "560001".to_owned(),
            country: "India".to_owned(),
            ..Address::default()
        };
        assert!(validate_address(&address, "Shipping").is_ok());

        address.postal_code = "  ".to_owned();
        let err = validate_address(&address, "Shipping").unwrap_err();
        assert_eq!(err.to_string(), "Shipping address postal code is required");
    }
}

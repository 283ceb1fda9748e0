//! Order repository.
//!
//! Reads go through `OrderRepository`. Steps that must share a transaction
//! (placing, cancelling and re-statusing an order) are free functions taking a
//! `PgConnection` so the caller owns the transaction.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use dream_collections_core::api::{Address, OrderStats};
use dream_collections_core::{CartId, OrderId, OrderStatus, UserId, VariantId};

use super::RepositoryError;
use crate::models::{Order, OrderItem, OrderStatusLog};

const ORDER_COLUMNS: &str = "id, user_id, customer_email, customer_name, customer_phone, \
    total_amount, status, payment_status, \
    shipping_street, shipping_address_line2, shipping_city, shipping_state_or_province, \
    shipping_postal_code, shipping_country, shipping_contact_phone, \
    billing_street, billing_address_line2, billing_city, billing_state_or_province, \
    billing_postal_code, billing_country, billing_contact_phone, \
    payment_method, shipping_method, tracking_number, payment_transaction_id, \
    created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_variant_id, product_name, variant_size, \
                            image_url, quantity, price_at_purchase";

/// A cart line as seen at checkout, with current variant and product data.
///
/// Product fields are `None` when the variant no longer exists.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckoutLine {
    pub product_variant_id: VariantId,
    pub quantity: i32,
    pub stock_quantity: Option<i32>,
    pub product_name: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
}

/// Header fields for a new order.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub customer_email: Option<&'a str>,
    pub customer_name: Option<&'a str>,
    pub customer_phone: Option<&'a str>,
    pub total_amount: Decimal,
    pub shipping: &'a Address,
    pub billing: &'a Address,
    pub payment_method: &'a str,
    pub shipping_method: Option<&'a str>,
}

/// Admin listing filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
}

/// Cart lines locked for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_cart_lines(
    conn: &mut PgConnection,
    cart: CartId,
) -> Result<Vec<CheckoutLine>, RepositoryError> {
    let lines = sqlx::query_as::<_, CheckoutLine>(
        "SELECT ci.product_variant_id, ci.quantity, v.stock_quantity, \
                p.name AS product_name, v.size, p.image_url, p.price \
         FROM cart_items ci \
         LEFT JOIN product_variants v ON v.id = ci.product_variant_id \
         LEFT JOIN products p ON p.id = v.product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY ci.id \
         FOR UPDATE OF ci",
    )
    .bind(cart)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

/// Take `quantity` units of stock. Returns `false` when not enough is left.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    variant: VariantId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE product_variants SET stock_quantity = stock_quantity - $2 \
         WHERE id = $1 AND stock_quantity >= $2",
    )
    .bind(variant)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Put stock back. Variants that no longer exist are skipped.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn restock(
    conn: &mut PgConnection,
    variant: VariantId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE product_variants SET stock_quantity = stock_quantity + $2 WHERE id = $1")
        .bind(variant)
        .bind(quantity)
        .execute(conn)
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder<'_>,
) -> Result<Order, RepositoryError> {
    let sql = format!(
        "INSERT INTO orders ( \
             user_id, customer_email, customer_name, customer_phone, total_amount, \
             shipping_street, shipping_address_line2, shipping_city, shipping_state_or_province, \
             shipping_postal_code, shipping_country, shipping_contact_phone, \
             billing_street, billing_address_line2, billing_city, billing_state_or_province, \
             billing_postal_code, billing_country, billing_contact_phone, \
             payment_method, shipping_method \
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                   $18, $19, $20, $21) \
         RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(order.user_id)
        .bind(order.customer_email)
        .bind(order.customer_name)
        .bind(order.customer_phone)
        .bind(order.total_amount)
        .bind(&order.shipping.street)
        .bind(&order.shipping.address_line2)
        .bind(&order.shipping.city)
        .bind(&order.shipping.state_or_province)
        .bind(&order.shipping.postal_code)
        .bind(&order.shipping.country)
        .bind(&order.shipping.contact_phone)
        .bind(&order.billing.street)
        .bind(&order.billing.address_line2)
        .bind(&order.billing.city)
        .bind(&order.billing.state_or_province)
        .bind(&order.billing.postal_code)
        .bind(&order.billing.country)
        .bind(&order.billing.contact_phone)
        .bind(order.payment_method)
        .bind(order.shipping_method)
        .fetch_one(conn)
        .await?;
    Ok(row)
}

/// Snapshot one cart line into the order.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if the line has no product data.
pub async fn insert_item(
    conn: &mut PgConnection,
    order: OrderId,
    line: &CheckoutLine,
) -> Result<OrderItem, RepositoryError> {
    let (Some(name), Some(size), Some(price)) = (&line.product_name, &line.size, line.price) else {
        return Err(RepositoryError::DataCorruption(format!(
            "variant {} has no product",
            line.product_variant_id
        )));
    };
    let sql = format!(
        "INSERT INTO order_items \
             (order_id, product_variant_id, product_name, variant_size, image_url, quantity, \
              price_at_purchase) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {ITEM_COLUMNS}"
    );
    let item = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order)
        .bind(line.product_variant_id)
        .bind(name)
        .bind(size)
        .bind(&line.image_url)
        .bind(line.quantity)
        .bind(price)
        .fetch_one(conn)
        .await?;
    Ok(item)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_status_log(
    conn: &mut PgConnection,
    order: OrderId,
    previous: Option<OrderStatus>,
    new: OrderStatus,
    changed_by: &str,
    notes: Option<&str>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO order_status_logs (order_id, previous_status, new_status, changed_by, notes) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order)
    .bind(previous)
    .bind(new)
    .bind(changed_by)
    .bind(notes)
    .execute(conn)
    .await?;
    Ok(())
}

/// Load an order and lock it against concurrent status changes.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist.
pub async fn lock_order(conn: &mut PgConnection, id: OrderId) -> Result<Order, RepositoryError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    let sql = format!(
        "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .bind(status)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_of(
    conn: &mut PgConnection,
    order: OrderId,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Repository for reading orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Lines of several orders, grouped by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for(&self, orders: &[OrderId]) -> Result<Vec<OrderItem>, RepositoryError> {
        let ids: Vec<i32> = orders.iter().map(OrderId::as_i32).collect();
        let sql =
            format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id");
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;
        Ok(items)
    }

    /// A user's orders, newest first, plus their total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        self.list(
            OrderFilter {
                status: None,
                user_id: Some(user),
            },
            limit,
            offset,
        )
        .await
    }

    /// Orders matching `filter`, newest first, plus their total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: OrderFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_order_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_order_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let orders = qb.build_query_as::<Order>().fetch_all(self.pool).await?;

        Ok((orders, total))
    }

    /// Status history of an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_history(&self, order: OrderId) -> Result<Vec<OrderStatusLog>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderStatusLog>(
            "SELECT previous_status, new_status, changed_by, notes, changed_at \
             FROM order_status_logs WHERE order_id = $1 ORDER BY changed_at, id",
        )
        .bind(order)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Order counters for one customer.
    ///
    /// Pending covers both awaiting-payment states; completed means delivered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats_for_user(&self, user: UserId) -> Result<OrderStats, RepositoryError> {
        let (total_orders, total_amount, pending_orders, completed_orders) =
            sqlx::query_as::<_, (i64, Decimal, i64, i64)>(
                "SELECT COUNT(*), \
                        COALESCE(SUM(total_amount), 0), \
                        COUNT(*) FILTER (WHERE status IN \
                            ('PENDING_PAYMENT', 'AWAITING_PAYMENT_CONFIRMATION')), \
                        COUNT(*) FILTER (WHERE status = 'DELIVERED') \
                 FROM orders WHERE user_id = $1",
            )
            .bind(user)
            .fetch_one(self.pool)
            .await?;

        Ok(OrderStats {
            total_orders,
            total_amount,
            pending_orders,
            completed_orders,
        })
    }
}

fn push_order_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: OrderFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(user) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_filter_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_order_filter(
            &mut qb,
            OrderFilter {
                status: Some(OrderStatus::Shipped),
                user_id: Some(UserId::new(4)),
            },
        );
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM orders WHERE TRUE AND status = $1 AND user_id = $2"
        );
    }
}

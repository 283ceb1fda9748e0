//! Cart repository.
//!
//! Reads go through `CartRepository`. Mutations are free functions taking a
//! `PgConnection` so the caller runs the stock check, the line write and the
//! cart timestamp in one transaction.

use sqlx::{PgConnection, PgPool};

use dream_collections_core::{CartId, UserId, VariantId};

use super::RepositoryError;
use crate::models::CartItem;

const UPSERT_CART: &str = "INSERT INTO carts (user_id) VALUES ($1) \
                           ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id \
                           RETURNING id";

/// The user's cart id, creating an empty cart on first use.
///
/// The upsert always writes the cart row, so it stays locked until the
/// transaction ends and mutations of one cart run one at a time.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn lock_cart(conn: &mut PgConnection, user: UserId) -> Result<CartId, RepositoryError> {
    let id = sqlx::query_scalar::<_, CartId>(UPSERT_CART)
        .bind(user)
        .fetch_one(conn)
        .await?;
    Ok(id)
}

/// Quantity of a variant already in the cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn quantity_of(
    conn: &mut PgConnection,
    cart: CartId,
    variant: VariantId,
) -> Result<Option<i32>, RepositoryError> {
    let qty = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_variant_id = $2",
    )
    .bind(cart)
    .bind(variant)
    .fetch_optional(conn)
    .await?;
    Ok(qty)
}

/// Add `quantity` to a line, creating it when absent.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn add_quantity(
    conn: &mut PgConnection,
    cart: CartId,
    variant: VariantId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO cart_items (cart_id, product_variant_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (cart_id, product_variant_id) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(cart)
    .bind(variant)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the variant is not in the cart.
pub async fn set_quantity(
    conn: &mut PgConnection,
    cart: CartId,
    variant: VariantId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND product_variant_id = $2",
    )
    .bind(cart)
    .bind(variant)
    .bind(quantity)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the variant is not in the cart.
pub async fn remove(
    conn: &mut PgConnection,
    cart: CartId,
    variant: VariantId,
) -> Result<(), RepositoryError> {
    let result =
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_variant_id = $2")
            .bind(cart)
            .bind(variant)
            .execute(conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear(conn: &mut PgConnection, cart: CartId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart)
        .execute(conn)
        .await?;
    Ok(())
}

/// Bump the cart's `updated_at`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn touch(conn: &mut PgConnection, cart: CartId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE carts SET updated_at = now() WHERE id = $1")
        .bind(cart)
        .execute(conn)
        .await?;
    Ok(())
}

/// Repository for reading server-side carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart id, creating an empty cart on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn get_or_create(&self, user: UserId) -> Result<CartId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>(UPSERT_CART)
            .bind(user)
            .fetch_one(self.pool)
            .await?;
        Ok(id)
    }

    /// Lines of a cart, oldest first, joined with their variant and product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, cart: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItem>(
            "SELECT ci.id, ci.product_variant_id, ci.quantity, \
                    p.name AS product_name, p.image_url, v.size, p.price \
             FROM cart_items ci \
             LEFT JOIN product_variants v ON v.id = ci.product_variant_id \
             LEFT JOIN products p ON p.id = v.product_id \
             WHERE ci.cart_id = $1 \
             ORDER BY ci.id",
        )
        .bind(cart)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

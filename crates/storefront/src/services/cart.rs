//! Server-side cart.
//!
//! Every mutation returns the recomputed cart. Each one runs in a single
//! transaction that holds the cart row, and the variant row while its stock
//! is checked. Stock is checked when a line grows but not reserved;
//! reservation happens at checkout.

use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::instrument;

use dream_collections_core::api::{CartLine, CartView, VariantDetail};
use dream_collections_core::{CartId, UserId, VariantId};

use crate::db::carts;
use crate::db::products::lock_variant_detail;
use crate::db::{CartRepository, RepositoryError, UserRepository};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

pub struct CartService<'a> {
    pool: &'a PgPool,
    carts: CartRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            carts: CartRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// The user's cart, created empty on first access.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the cart cannot be loaded.
    pub async fn view(&self, user: UserId) -> Result<CartView, CartError> {
        let cart = self.carts.get_or_create(user).await?;
        self.render(cart, user).await
    }

    /// Another user's cart, for admins.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the user does not exist.
    pub async fn view_for(&self, user: UserId) -> Result<CartView, CartError> {
        if self.users.get_by_id(user).await?.is_none() {
            return Err(CartError::NotFound(format!("User not found with id: {user}")));
        }
        self.view(user).await
    }

    /// Add units of a variant, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Invalid` for a quantity below one, `NotFound` for an
    /// unknown variant and `InsufficientStock` when the line would exceed stock.
    #[instrument(skip(self), fields(user_id = %user, variant_id = %variant))]
    pub async fn add(
        &self,
        user: UserId,
        variant: VariantId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity < 1 {
            return Err(CartError::Invalid("Quantity must be at least 1".to_owned()));
        }
        let mut tx = self.pool.begin().await?;
        let cart = carts::lock_cart(&mut *tx, user).await?;
        let detail = locked_variant(&mut *tx, variant).await?;
        let existing = carts::quantity_of(&mut *tx, cart, variant)
            .await?
            .unwrap_or(0);
        ensure_stock(&detail, existing.saturating_add(quantity))?;

        carts::add_quantity(&mut *tx, cart, variant, quantity).await?;
        carts::touch(&mut *tx, cart).await?;
        tx.commit().await?;
        self.render(cart, user).await
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the variant is not in the cart,
    /// `Invalid` for a negative quantity and `InsufficientStock` when the
    /// quantity exceeds stock.
    #[instrument(skip(self), fields(user_id = %user, variant_id = %variant))]
    pub async fn update(
        &self,
        user: UserId,
        variant: VariantId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity < 0 {
            return Err(CartError::Invalid("Quantity cannot be negative".to_owned()));
        }
        let mut tx = self.pool.begin().await?;
        let cart = carts::lock_cart(&mut *tx, user).await?;
        if carts::quantity_of(&mut *tx, cart, variant).await?.is_none() {
            return Err(not_in_cart(variant));
        }

        if quantity == 0 {
            carts::remove(&mut *tx, cart, variant)
                .await
                .map_err(|e| line_error(e, variant))?;
        } else {
            let detail = locked_variant(&mut *tx, variant).await?;
            ensure_stock(&detail, quantity)?;
            carts::set_quantity(&mut *tx, cart, variant, quantity)
                .await
                .map_err(|e| line_error(e, variant))?;
        }
        carts::touch(&mut *tx, cart).await?;
        tx.commit().await?;
        self.render(cart, user).await
    }

    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the variant is not in the cart.
    #[instrument(skip(self), fields(user_id = %user, variant_id = %variant))]
    pub async fn remove(&self, user: UserId, variant: VariantId) -> Result<CartView, CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::lock_cart(&mut *tx, user).await?;
        carts::remove(&mut *tx, cart, variant)
            .await
            .map_err(|e| line_error(e, variant))?;
        carts::touch(&mut *tx, cart).await?;
        tx.commit().await?;
        self.render(cart, user).await
    }

    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn clear(&self, user: UserId) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::lock_cart(&mut *tx, user).await?;
        carts::clear(&mut *tx, cart).await?;
        carts::touch(&mut *tx, cart).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn render(&self, cart: CartId, user: UserId) -> Result<CartView, CartError> {
        let lines = self
            .carts
            .items(cart)
            .await?
            .into_iter()
            .map(CartLine::from)
            .collect();
        Ok(CartView::from_lines(cart, user, lines))
    }
}

async fn locked_variant(
    conn: &mut PgConnection,
    id: VariantId,
) -> Result<VariantDetail, CartError> {
    lock_variant_detail(conn, id)
        .await?
        .ok_or_else(|| CartError::NotFound(format!("Product variant not found with id: {id}")))
}

fn ensure_stock(variant: &VariantDetail, wanted: i32) -> Result<(), CartError> {
    if wanted > variant.stock_quantity {
        return Err(CartError::InsufficientStock(format!(
            "Not enough stock for {} ({}). Available: {}, requested: {}",
            variant.product_name, variant.size, variant.stock_quantity, wanted
        )));
    }
    Ok(())
}

fn not_in_cart(variant: VariantId) -> CartError {
    CartError::NotFound(format!("Product variant {variant} is not in the cart"))
}

fn line_error(e: RepositoryError, variant: VariantId) -> CartError {
    match e {
        RepositoryError::NotFound => not_in_cart(variant),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use dream_collections_core::ProductId;

    use super::*;

    fn ring(stock: i32) -> VariantDetail {
        VariantDetail {
            id: VariantId::new(4),
            size: "7".to_owned(),
            stock_quantity: stock,
            product_id: ProductId::new(2),
            product_name: "Ruby Halo Ring".to_owned(),
            price: Decimal::new(3_499_900, 2),
            image_url: None,
        }
    }

    #[test]
    fn test_stock_check_allows_exact_stock() {
        assert!(ensure_stock(&ring(3), 3).is_ok());
    }

    #[test]
    fn test_stock_check_message() {
        let err = ensure_stock(&ring(3), 5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not enough stock for Ruby Halo Ring (7). Available: 3, requested: 5"
        );
    }
}

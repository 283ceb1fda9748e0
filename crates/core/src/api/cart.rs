//! Server-side cart bodies.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CartId, CartItemId, UserId, VariantId};

/// `POST /api/carts/mine/items`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub product_variant_id: VariantId,
    pub quantity: i32,
}

/// `PUT /api/carts/mine/items/{variantId}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// One line of a server-side cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub cart_item_id: CartItemId,
    pub product_variant_id: VariantId,
    pub product_name: String,
    #[serde(default)]
    pub product_image_url: Option<String>,
    pub variant_size: String,
    /// `None` when the variant no longer exists.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// A signed-in user's cart with totals worked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: CartId,
    pub user_id: UserId,
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub total_price: Decimal,
    pub total_items_count: i64,
}

impl CartView {
    /// Build a view from its lines, computing both totals.
    #[must_use]
    pub fn from_lines(cart_id: CartId, user_id: UserId, items: Vec<CartLine>) -> Self {
        let total_price = items.iter().map(|line| line.subtotal).sum();
        let total_items_count = items.iter().map(|line| i64::from(line.quantity)).sum();
        Self {
            cart_id,
            user_id,
            items,
            total_price,
            total_items_count,
        }
    }

    /// Quantity held for a variant, if it is in the cart.
    #[must_use]
    pub fn quantity_of(&self, variant: VariantId) -> Option<i32> {
        self.items
            .iter()
            .find(|line| line.product_variant_id == variant)
            .map(|line| line.quantity)
    }
}

impl CartLine {
    /// Shown in place of a product name when the variant has been deleted.
    pub const UNAVAILABLE_NAME: &'static str = "N/A (Product info unavailable)";

    /// A line whose variant could not be found.
    #[must_use]
    pub fn unavailable(cart_item_id: CartItemId, variant: VariantId, quantity: i32) -> Self {
        Self {
            cart_item_id,
            product_variant_id: variant,
            product_name: Self::UNAVAILABLE_NAME.to_owned(),
            product_image_url: None,
            variant_size: "N/A".to_owned(),
            unit_price: None,
            quantity,
            subtotal: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, price: i64, quantity: i32) -> CartLine {
        let unit = Decimal::new(price, 2);
        CartLine {
            cart_item_id: CartItemId::new(id),
            product_variant_id: VariantId::new(id * 10),
            product_name: format!("Item {id}"),
            product_image_url: None,
            variant_size: "One Size".to_owned(),
            unit_price: Some(unit),
            quantity,
            subtotal: unit * Decimal::from(quantity),
        }
    }

    #[test]
    fn test_totals() {
        let view = CartView::from_lines(
            CartId::new(1),
            UserId::new(7),
            vec![line(1, 166_550, 2), line(2, 108_250, 1)],
        );
        assert_eq!(view.total_items_count, 3);
        assert_eq!(view.total_price, Decimal::new(441_350, 2));
        assert_eq!(view.quantity_of(VariantId::new(10)), Some(2));
    }

    #[test]
    fn test_unavailable_line_contributes_nothing() {
        let view = CartView::from_lines(
            CartId::new(1),
            UserId::new(7),
            vec![CartLine::unavailable(CartItemId::new(3), VariantId::new(99), 4)],
        );
        assert_eq!(view.total_price, Decimal::ZERO);
        assert_eq!(view.total_items_count, 4);
        assert_eq!(view.items.first().map(|l| l.variant_size.as_str()), Some("N/A"));
    }
}

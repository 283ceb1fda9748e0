//! Cart rows.

use rust_decimal::Decimal;

use dream_collections_core::api::CartLine;
use dream_collections_core::{CartItemId, VariantId};

/// A cart line joined with whatever is left of its variant and product.
///
/// The product columns are `None` when the variant has been deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_variant_id: VariantId,
    pub quantity: i32,
    pub product_name: Option<String>,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub price: Option<Decimal>,
}

impl From<CartItem> for CartLine {
    fn from(item: CartItem) -> Self {
        let (Some(product_name), Some(variant_size)) = (item.product_name, item.size) else {
            return Self::unavailable(item.id, item.product_variant_id, item.quantity);
        };
        Self {
            cart_item_id: item.id,
            product_variant_id: item.product_variant_id,
            product_name,
            product_image_url: item.image_url,
            variant_size,
            unit_price: item.price,
            quantity: item.quantity,
            subtotal: item
                .price
                .map_or(Decimal::ZERO, |p| p * Decimal::from(item.quantity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: Option<Decimal>, name: Option<&str>) -> CartItem {
        CartItem {
            id: CartItemId::new(1),
            product_variant_id: VariantId::new(12),
            quantity: 2,
            product_name: name.map(str::to_owned),
            image_url: None,
            size: name.map(|_| "7".to_owned()),
            price,
        }
    }

    #[test]
    fn test_line_subtotal() {
        let line = CartLine::from(item(Some(Decimal::new(1_250_000, 2)), Some("Emerald Ring")));
        assert_eq!(line.subtotal, Decimal::new(2_500_000, 2));
        assert_eq!(line.variant_size, "7");
    }

    #[test]
    fn test_deleted_variant_is_unavailable() {
        let line = CartLine::from(item(None, None));
        assert_eq!(line.product_name, CartLine::UNAVAILABLE_NAME);
        assert_eq!(line.subtotal, Decimal::ZERO);
        assert_eq!(line.quantity, 2);
    }
}

//! Guest cart kept in local storage while a shopper is signed out.
//!
//! The stored JSON shape is `{"items":[{"productVariantId":1,"quantity":2}],"totalAmount":0}`.
//! Lines keep insertion order. Prices are never stored locally; totals are
//! worked out by the server once the cart is synced.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::VariantId;

/// One line of a guest cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCartItem {
    pub product_variant_id: VariantId,
    pub quantity: i32,
}

/// A cart that lives only on the shopper's device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GuestCart {
    #[serde(default)]
    pub items: Vec<GuestCartItem>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl GuestCart {
    /// Add `quantity` of a variant, merging with an existing line.
    ///
    /// Quantities below one are ignored. A merged line saturates at
    /// `i32::MAX`.
    pub fn add(&mut self, variant: VariantId, quantity: i32) {
        if quantity < 1 {
            return;
        }
        match self.line_mut(variant) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.items.push(GuestCartItem {
                product_variant_id: variant,
                quantity,
            }),
        }
    }

    /// Set the quantity of an existing line.
    ///
    /// A quantity of zero or less removes the line. Variants that are not in
    /// the cart are ignored.
    pub fn update(&mut self, variant: VariantId, quantity: i32) {
        if quantity <= 0 {
            self.remove(variant);
            return;
        }
        if let Some(line) = self.line_mut(variant) {
            line.quantity = quantity;
        }
    }

    /// Drop a line. Missing variants are not an error.
    pub fn remove(&mut self, variant: VariantId) {
        self.items.retain(|item| item.product_variant_id != variant);
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_amount = Decimal::ZERO;
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity held for a variant, if it is in the cart.
    #[must_use]
    pub fn quantity_of(&self, variant: VariantId) -> Option<i32> {
        self.items
            .iter()
            .find(|item| item.product_variant_id == variant)
            .map(|item| item.quantity)
    }

    fn line_mut(&mut self, variant: VariantId) -> Option<&mut GuestCartItem> {
        self.items
            .iter_mut()
            .find(|item| item.product_variant_id == variant)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const RING: VariantId = VariantId::new(11);
    const CHAIN: VariantId = VariantId::new(12);

    #[test]
    fn test_add_merges_existing_line() {
        let mut cart = GuestCart::default();
        cart.add(RING, 1);
        cart.add(CHAIN, 2);
        cart.add(RING, 3);

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.quantity_of(RING), Some(4));
        assert_eq!(cart.items[0].product_variant_id, RING);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_add_ignores_non_positive_quantity() {
        let mut cart = GuestCart::default();
        cart.add(RING, 0);
        cart.add(CHAIN, -4);
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);

        cart.add(RING, 2);
        cart.add(RING, -1);
        assert_eq!(cart.quantity_of(RING), Some(2));
    }

    #[test]
    fn test_add_saturates_instead_of_overflowing() {
        let mut cart = GuestCart::default();
        cart.add(RING, i32::MAX);
        cart.add(RING, 1);
        assert_eq!(cart.quantity_of(RING), Some(i32::MAX));
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_update_sets_quantity() {
        let mut cart = GuestCart::default();
        cart.add(RING, 1);
        cart.update(RING, 5);
        assert_eq!(cart.quantity_of(RING), Some(5));
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let mut cart = GuestCart::default();
        cart.add(RING, 2);
        cart.add(CHAIN, 1);
        cart.update(RING, 0);
        assert_eq!(cart.quantity_of(RING), None);
        cart.update(CHAIN, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_missing_line_is_noop() {
        let mut cart = GuestCart::default();
        cart.add(RING, 2);
        cart.update(CHAIN, 4);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.quantity_of(CHAIN), None);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = GuestCart::default();
        cart.add(RING, 2);
        cart.add(CHAIN, 1);
        cart.remove(RING);
        cart.remove(VariantId::new(999));
        assert_eq!(cart.item_count(), 1);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_storage_shape() {
        let mut cart = GuestCart::default();
        cart.add(RING, 2);
        let json = serde_json::to_string(&cart).unwrap();
        assert_eq!(
            json,
            r#"{"items":[{"productVariantId":11,"quantity":2}],"totalAmount":0.0}"#
        );

        let empty: GuestCart = serde_json::from_str(r#"{"items":[],"totalAmount":0}"#).unwrap();
        assert!(empty.is_empty());

        let bare: GuestCart = serde_json::from_str("{}").unwrap();
        assert_eq!(bare, GuestCart::default());
    }
}

//! Category and product bodies.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ProductId, VariantId};

/// Create or update a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "parentCategoryId")]
    pub parent_id: Option<CategoryId>,
}

/// A category with its sub-categories nested beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub sub_categories: Vec<CategoryResponse>,
}

impl CategoryResponse {
    /// Depth-first search of this subtree.
    #[must_use]
    pub fn find(&self, id: CategoryId) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.sub_categories.iter().find_map(|child| child.find(id))
    }

    /// Ids of this category and every descendant.
    #[must_use]
    pub fn subtree_ids(&self) -> Vec<CategoryId> {
        let mut ids = vec![self.id];
        for child in &self.sub_categories {
            ids.extend(child.subtree_ids());
        }
        ids
    }
}

/// The category a product belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Variant as sent when creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRequest {
    pub size: String,
    pub stock_quantity: i32,
}

/// `POST /api/products/variants`: add a variant to an existing product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariantRequest {
    pub product_id: ProductId,
    pub size: String,
    pub stock_quantity: i32,
}

/// `PUT /api/products/variants/{id}/stock`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateRequest {
    pub stock_quantity: i32,
}

/// Create or replace a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub variants: Vec<VariantRequest>,
}

/// A purchasable size of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantResponse {
    pub id: VariantId,
    pub size: String,
    pub stock_quantity: i32,
    pub product_id: ProductId,
}

/// A variant together with the product fields a cart line needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDetail {
    pub id: VariantId,
    pub size: String,
    pub stock_quantity: i32,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A product with its category and variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    pub category: CategorySummary,
    #[serde(default)]
    pub variants: Vec<VariantResponse>,
}

impl ProductResponse {
    /// Total units in stock across all variants.
    #[must_use]
    pub fn total_stock(&self) -> i64 {
        self.variants
            .iter()
            .map(|v| i64::from(v.stock_quantity))
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn leaf(id: i32, name: &str) -> CategoryResponse {
        CategoryResponse {
            id: CategoryId::new(id),
            name: name.to_owned(),
            description: None,
            parent_id: Some(CategoryId::new(1)),
            parent_name: None,
            sub_categories: Vec::new(),
        }
    }

    #[test]
    fn test_subtree_ids_and_find() {
        let tree = CategoryResponse {
            id: CategoryId::new(1),
            name: "Kids Collection".to_owned(),
            description: None,
            parent_id: None,
            parent_name: None,
            sub_categories: vec![leaf(2, "Kids Rings"), leaf(3, "Baby Jewelry")],
        };
        assert_eq!(
            tree.subtree_ids(),
            vec![CategoryId::new(1), CategoryId::new(2), CategoryId::new(3)]
        );
        assert_eq!(tree.find(CategoryId::new(3)).unwrap().name, "Baby Jewelry");
        assert!(tree.find(CategoryId::new(9)).is_none());
    }

    #[test]
    fn test_category_request_accepts_parent_category_id() {
        let parsed: CategoryRequest =
            serde_json::from_str(r#"{"name":"Rings","parentCategoryId":4}"#).unwrap();
        assert_eq!(parsed.parent_id, Some(CategoryId::new(4)));
    }

    #[test]
    fn test_product_request_accepts_numeric_price() {
        let parsed: ProductRequest = serde_json::from_str(
            r#"{"name":"Pearl Strand Necklace","price":24999.00,"categoryId":2}"#,
        )
        .unwrap();
        assert_eq!(parsed.price, Decimal::new(24999, 0));
        assert!(parsed.variants.is_empty());
    }
}

//! Catalog rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use dream_collections_core::api::{CategorySummary, VariantResponse};
use dream_collections_core::{CategoryId, ProductId, VariantId};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

impl Category {
    #[must_use]
    pub fn summary(&self) -> CategorySummary {
        CategorySummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A size of a product with its own stock level.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub size: String,
    pub stock_quantity: i32,
}

impl From<Variant> for VariantResponse {
    fn from(v: Variant) -> Self {
        Self {
            id: v.id,
            size: v.size,
            stock_quantity: v.stock_quantity,
            product_id: v.product_id,
        }
    }
}

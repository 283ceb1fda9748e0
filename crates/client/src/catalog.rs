//! Category and product browsing, plus the admin writes used for seeding.

use rust_decimal::Decimal;
use tracing::instrument;

use dream_collections_core::api::{
    CategoryRequest, CategoryResponse, NewVariantRequest, Page, ProductRequest, ProductResponse,
    StockUpdateRequest, VariantDetail, VariantResponse,
};
use dream_collections_core::{CategoryId, ProductId, VariantId};

use crate::api::ApiClient;
use crate::error::ClientError;

/// Paging, sorting and filters for product listings.
///
/// `sort` is `field` or `field,asc|desc` with `name`, `price`, `createdAt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductQuery {
    #[must_use]
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sorted_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.size {
            pairs.push(("size", size.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(category) = self.category_id {
            pairs.push(("categoryId", category.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.to_string()));
        }
        pairs
    }
}

/// Catalog endpoints.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    api: ApiClient,
}

impl CatalogClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Top-level categories with their sub-categories.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<CategoryResponse>, ClientError> {
        self.api.get("/categories", &[]).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the category does not exist.
    #[instrument(skip(self))]
    pub async fn category(&self, id: CategoryId) -> Result<CategoryResponse, ClientError> {
        self.api.get(&format!("/categories/{id}"), &[]).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or no category has this name.
    #[instrument(skip(self))]
    pub async fn category_by_name(&self, name: &str) -> Result<CategoryResponse, ClientError> {
        self.api.get_by_name("/categories/name", name).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the parent does not exist.
    #[instrument(skip(self))]
    pub async fn subcategories(&self, id: CategoryId) -> Result<Vec<CategoryResponse>, ClientError> {
        self.api
            .get(&format!("/categories/{id}/subcategories"), &[])
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the query is rejected.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Page<ProductResponse>, ClientError> {
        self.api.get("/products", &query.pairs()).await
    }

    /// Products in a category and all of its sub-categories.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the category does not exist.
    #[instrument(skip(self))]
    pub async fn products_by_category(
        &self,
        id: CategoryId,
        query: &ProductQuery,
    ) -> Result<Page<ProductResponse>, ClientError> {
        self.api
            .get(&format!("/products/category/{id}"), &query.pairs())
            .await
    }

    /// Products whose name contains `name`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or `name` is blank.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        name: &str,
        query: &ProductQuery,
    ) -> Result<Page<ProductResponse>, ClientError> {
        let mut pairs = query.pairs();
        pairs.retain(|(key, _)| *key != "search");
        pairs.push(("name", name.to_string()));
        self.api.get("/products/search", &pairs).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the product does not exist.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<ProductResponse, ClientError> {
        self.api.get(&format!("/products/{id}"), &[]).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the variant does not exist.
    #[instrument(skip(self))]
    pub async fn variant(&self, id: VariantId) -> Result<VariantDetail, ClientError> {
        self.api.get(&format!("/products/variants/{id}"), &[]).await
    }

    /// Details for several variants; unknown ids are left out.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn variants_by_ids(&self, ids: &[VariantId]) -> Result<Vec<VariantDetail>, ClientError> {
        self.api.post("/products/variants/findByIds", ids).await
    }

    /// Admin only.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_category(
        &self,
        request: &CategoryRequest,
    ) -> Result<CategoryResponse, ClientError> {
        self.api.post("/categories", request).await
    }

    /// Admin only.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: &ProductRequest,
    ) -> Result<ProductResponse, ClientError> {
        self.api.post("/products", request).await
    }

    /// Admin only.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn add_variant(
        &self,
        request: &NewVariantRequest,
    ) -> Result<VariantResponse, ClientError> {
        self.api.post("/products/variants", request).await
    }

    /// Admin only.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    #[instrument(skip(self))]
    pub async fn set_stock(
        &self,
        id: VariantId,
        stock_quantity: i32,
    ) -> Result<VariantResponse, ClientError> {
        self.api
            .put(
                &format!("/products/variants/{id}/stock"),
                &StockUpdateRequest { stock_quantity },
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_query_pairs() {
        let query = ProductQuery {
            category_id: Some(CategoryId::new(3)),
            min_price: Some(Decimal::new(50_000, 2)),
            ..ProductQuery::page(1, 12).sorted_by("price,desc")
        };
        let api = ApiClient::new("http://localhost:8080/api", Arc::new(MemoryStorage::new()));
        let url = api.url("/products", &query.pairs()).unwrap();
        assert_eq!(
            url.query(),
            Some("page=1&size=12&sort=price%2Cdesc&categoryId=3&minPrice=500.00")
        );
    }

    #[test]
    fn test_default_query_is_empty() {
        assert!(ProductQuery::default().pairs().is_empty());
    }
}

//! Product and variant handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use dream_collections_core::api::{
    MessageResponse, NewVariantRequest, Page, ProductRequest, ProductResponse, StockUpdateRequest,
    VariantDetail, VariantResponse,
};
use dream_collections_core::{CategoryId, ProductId, VariantId};

use crate::db::products::ProductSort;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::catalog::CatalogService;
use crate::services::{DEFAULT_PAGE_SIZE, PageRequest};
use crate::state::AppState;

/// Query parameters of the product listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub category_id: Option<CategoryId>,
    /// `search` on the listing, `name` on `/search`.
    #[serde(alias = "name")]
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(0),
            size: self.size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    fn sort(&self) -> Result<ProductSort> {
        self.sort
            .as_deref()
            .map_or_else(|| Ok(ProductSort::default()), str::parse)
            .map_err(AppError::BadRequest)
    }

    fn price_range(&self) -> Result<(Option<Decimal>, Option<Decimal>)> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(AppError::BadRequest(
                "minPrice cannot be greater than maxPrice".to_string(),
            ));
        }
        Ok((self.min_price, self.max_price))
    }
}

fn catalog(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.pool(), state.categories())
}

async fn list_with(
    state: &AppState,
    query: &ProductQuery,
    category: Option<CategoryId>,
) -> Result<Json<Page<ProductResponse>>> {
    let (min_price, max_price) = query.price_range()?;
    let page = catalog(state)
        .list_products(
            category,
            query.search.as_deref(),
            min_price,
            max_price,
            query.sort()?,
            query.page_request(),
        )
        .await?;
    Ok(Json(page))
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<ProductResponse>>> {
    list_with(&state, &query, query.category_id).await
}

/// `GET /api/products/category/{categoryId}`
#[instrument(skip(state))]
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<CategoryId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<ProductResponse>>> {
    list_with(&state, &query, Some(category)).await
}

/// `GET /api/products/search?name=`
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<ProductResponse>>> {
    if query.search.as_deref().is_none_or(|s| s.trim().is_empty()) {
        return Err(AppError::BadRequest("Search term is required".to_string()));
    }
    list_with(&state, &query, query.category_id).await
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>> {
    Ok(Json(catalog(&state).product(id).await?))
}

/// `POST /api/products`
#[instrument(skip(state, _admin, req), fields(name = %req.name))]
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let product = catalog(&state).create_product(&req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{id}`
#[instrument(skip(state, _admin, req))]
pub async fn replace(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<ProductResponse>> {
    Ok(Json(catalog(&state).replace_product(id, &req).await?))
}

/// `DELETE /api/products/{id}`
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<MessageResponse>> {
    catalog(&state).delete_product(id).await?;
    Ok(Json(MessageResponse::ok("Product deleted successfully")))
}

/// `POST /api/products/variants`
#[instrument(skip(state, _admin, req), fields(product_id = %req.product_id))]
pub async fn add_variant(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(req): Json<NewVariantRequest>,
) -> Result<(StatusCode, Json<VariantResponse>)> {
    let variant = catalog(&state).add_variant(&req).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

/// `GET /api/products/variants/{id}`
#[instrument(skip(state))]
pub async fn variant(
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
) -> Result<Json<VariantDetail>> {
    Ok(Json(catalog(&state).variant(id).await?))
}

/// `POST /api/products/variants/findByIds`
#[instrument(skip(state, ids), fields(count = ids.len()))]
pub async fn variants_by_ids(
    State(state): State<AppState>,
    Json(ids): Json<Vec<VariantId>>,
) -> Result<Json<Vec<VariantDetail>>> {
    Ok(Json(catalog(&state).variants(&ids).await?))
}

/// `PUT /api/products/variants/{id}/stock`
#[instrument(skip(state, _admin))]
pub async fn set_stock(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<VariantId>,
    Json(req): Json<StockUpdateRequest>,
) -> Result<Json<VariantResponse>> {
    Ok(Json(catalog(&state).set_stock(id, req.stock_quantity).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(raw: &str) -> ProductQuery {
        let uri: axum::http::Uri = format!("/api/products?{raw}").parse().unwrap();
        Query::<ProductQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_query_defaults() {
        let q = query("");
        let page = q.page_request();
        assert_eq!(page.page, 0);
        assert_eq!(page.size(), DEFAULT_PAGE_SIZE);
        assert_eq!(q.sort().unwrap(), ProductSort::default());
    }

    #[test]
    fn test_query_parses_filters() {
        let q = query("page=1&size=5&sort=price,desc&categoryId=3&minPrice=1000&maxPrice=5000.50");
        assert_eq!(q.page_request().offset(), 5);
        assert!(q.sort().unwrap().descending);
        assert_eq!(q.category_id, Some(CategoryId::new(3)));
        assert_eq!(q.max_price, Some(Decimal::new(500_050, 2)));
    }

    #[test]
    fn test_search_name_alias() {
        assert_eq!(query("name=pearl").search.as_deref(), Some("pearl"));
    }

    #[test]
    fn test_inverted_price_range_rejected() {
        assert!(query("minPrice=10&maxPrice=5").price_range().is_err());
    }

    #[test]
    fn test_unknown_sort_rejected() {
        assert!(matches!(query("sort=weight").sort(), Err(AppError::BadRequest(_))));
    }
}

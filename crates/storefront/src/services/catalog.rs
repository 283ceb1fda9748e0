//! Catalog service: the category tree and products.
//!
//! The full category list is small and read on nearly every catalog request,
//! so it is cached in memory (`moka`, 5-minute TTL) and the tree is assembled
//! from it. Every category write invalidates the cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, instrument};

use dream_collections_core::api::{
    CategoryRequest, CategoryResponse, CategorySummary, NewVariantRequest, Page, ProductRequest,
    ProductResponse, VariantDetail, VariantResponse,
};
use dream_collections_core::{CategoryId, ProductId, VariantId};

use super::PageRequest;
use crate::db::products::{ProductFilter, ProductSort};
use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::models::{Category, Product};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// In-memory copy of every category.
#[derive(Clone)]
pub struct CategoryCache {
    inner: Cache<(), Arc<Vec<Category>>>,
}

impl CategoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(300))
                .build(),
        }
    }

    async fn load(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(all) = self.inner.get(&()).await {
            debug!("Cache hit for categories");
            return Ok(all);
        }
        let all = Arc::new(CategoryRepository::new(pool).list_all().await?);
        self.inner.insert((), Arc::clone(&all)).await;
        Ok(all)
    }

    /// Drop the cached list so the next read hits the database.
    pub async fn invalidate(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}

impl Default for CategoryCache {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CatalogService<'a> {
    pool: &'a PgPool,
    categories: CategoryRepository<'a>,
    products: ProductRepository<'a>,
    cache: &'a CategoryCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CategoryCache) -> Self {
        Self {
            pool,
            categories: CategoryRepository::new(pool),
            products: ProductRepository::new(pool),
            cache,
        }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Top-level categories with their sub-categories nested.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the categories cannot be loaded.
    pub async fn category_tree(&self) -> Result<Vec<CategoryResponse>, CatalogError> {
        let all = self.cache.load(self.pool).await?;
        Ok(build_tree(&all))
    }

    /// One category with its subtree.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    pub async fn category(&self, id: CategoryId) -> Result<CategoryResponse, CatalogError> {
        let all = self.cache.load(self.pool).await?;
        subtree(&all, id).ok_or_else(|| category_not_found(id))
    }

    /// A category by case-insensitive name, without its children.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no category has that name.
    pub async fn category_by_name(&self, name: &str) -> Result<CategoryResponse, CatalogError> {
        let category = self
            .categories
            .get_by_name(name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Category not found with name: {name}")))?;
        let all = self.cache.load(self.pool).await?;
        let names = names_by_id(&all);
        Ok(flat_response(&category, &names))
    }

    /// Direct children of a category, each with its own subtree.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the parent does not exist.
    pub async fn subcategories(&self, id: CategoryId) -> Result<Vec<CategoryResponse>, CatalogError> {
        Ok(self.category(id).await?.sub_categories)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a blank name, `NotFound` for an
    /// unknown parent and `Conflict` for a duplicate name.
    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create_category(&self, req: &CategoryRequest) -> Result<CategoryResponse, CatalogError> {
        let name = required_name(&req.name, "Category")?;
        if let Some(parent) = req.parent_id {
            self.require_category(parent).await?;
        }
        let created = self
            .categories
            .create(name, req.description.as_deref(), req.parent_id)
            .await
            .map_err(name_conflict)?;
        self.cache.invalidate().await;
        tracing::info!(category_id = %created.id, "Category created");
        self.category(created.id).await
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` when the new parent would create a
    /// cycle, plus the errors of [`CatalogService::create_category`].
    #[instrument(skip(self, req), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        req: &CategoryRequest,
    ) -> Result<CategoryResponse, CatalogError> {
        let name = required_name(&req.name, "Category")?;
        let current = self.category(id).await?;
        if let Some(parent) = req.parent_id {
            if current.find(parent).is_some() {
                return Err(CatalogError::Invalid(
                    "A category cannot be moved beneath itself".to_owned(),
                ));
            }
            self.require_category(parent).await?;
        }
        self.categories
            .update(id, name, req.description.as_deref(), req.parent_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => category_not_found(id),
                other => name_conflict(other),
            })?;
        self.cache.invalidate().await;
        self.category(id).await
    }

    /// Delete a category and its sub-categories.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Conflict` while any product is filed under the
    /// category or one of its descendants.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        self.require_category(id).await?;
        if self.categories.subtree_has_products(id).await? {
            return Err(CatalogError::Conflict(
                "Cannot delete category: it or its sub-categories still have products".to_owned(),
            ));
        }
        self.categories.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => category_not_found(id),
            other => other.into(),
        })?;
        self.cache.invalidate().await;
        tracing::info!("Category deleted");
        Ok(())
    }

    async fn require_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        let all = self.cache.load(self.pool).await?;
        if all.iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(category_not_found(id))
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// One page of products.
    ///
    /// A category filter covers the category and all of its descendants.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown category filter.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        category: Option<CategoryId>,
        search: Option<&str>,
        min_price: Option<Decimal>,
        max_price: Option<Decimal>,
        sort: ProductSort,
        page: PageRequest,
    ) -> Result<Page<ProductResponse>, CatalogError> {
        let category_ids = match category {
            Some(id) => Some(self.category(id).await?.subtree_ids()),
            None => None,
        };
        let filter = ProductFilter {
            category_ids,
            name_contains: search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned),
            min_price,
            max_price,
        };
        let (products, total) = self
            .products
            .list(&filter, sort, page.limit(), page.offset())
            .await?;
        let content = self.assemble(products).await?;
        Ok(Page::new(content, page.page, page.size(), total))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn product(&self, id: ProductId) -> Result<ProductResponse, CatalogError> {
        let product = self
            .products
            .get(id)
            .await?
            .ok_or_else(|| product_not_found(id))?;
        self.assemble_one(product).await
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown category, `Invalid` for
    /// a bad price or stock level.
    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create_product(&self, req: &ProductRequest) -> Result<ProductResponse, CatalogError> {
        self.validate_product(req).await?;
        let product = self.products.create(req).await?;
        tracing::info!(product_id = %product.id, "Product created");
        self.assemble_one(product).await
    }

    /// Overwrite a product; its variants are replaced by the request's.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product or category does not exist.
    #[instrument(skip(self, req), fields(product_id = %id))]
    pub async fn replace_product(
        &self,
        id: ProductId,
        req: &ProductRequest,
    ) -> Result<ProductResponse, CatalogError> {
        self.validate_product(req).await?;
        let product = self.products.replace(id, req).await.map_err(|e| match e {
            RepositoryError::NotFound => product_not_found(id),
            other => other.into(),
        })?;
        self.assemble_one(product).await
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        self.products.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => product_not_found(id),
            other => other.into(),
        })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist,
    /// `Invalid` for a blank size or negative stock.
    pub async fn add_variant(&self, req: &NewVariantRequest) -> Result<VariantResponse, CatalogError> {
        let size = required_name(&req.size, "Variant size")?;
        validate_stock(req.stock_quantity)?;
        let variant = self
            .products
            .add_variant(req.product_id, size, req.stock_quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => product_not_found(req.product_id),
                other => other.into(),
            })?;
        Ok(variant.into())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the variant does not exist.
    pub async fn variant(&self, id: VariantId) -> Result<VariantDetail, CatalogError> {
        self.products
            .variant_detail(id)
            .await?
            .ok_or_else(|| variant_not_found(id))
    }

    /// Details for the ids that exist; unknown ids are left out.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the lookup fails.
    pub async fn variants(&self, ids: &[VariantId]) -> Result<Vec<VariantDetail>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.products.variant_details(ids).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for negative stock, `NotFound` for an
    /// unknown variant.
    pub async fn set_stock(
        &self,
        id: VariantId,
        stock_quantity: i32,
    ) -> Result<VariantResponse, CatalogError> {
        validate_stock(stock_quantity)?;
        let variant = self
            .products
            .set_stock(id, stock_quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => variant_not_found(id),
                other => other.into(),
            })?;
        Ok(variant.into())
    }

    async fn validate_product(&self, req: &ProductRequest) -> Result<(), CatalogError> {
        required_name(&req.name, "Product")?;
        if req.price.is_sign_negative() {
            return Err(CatalogError::Invalid("Price cannot be negative".to_owned()));
        }
        for variant in &req.variants {
            required_name(&variant.size, "Variant size")?;
            validate_stock(variant.stock_quantity)?;
        }
        self.require_category(req.category_id).await
    }

    async fn assemble_one(&self, product: Product) -> Result<ProductResponse, CatalogError> {
        self.assemble(vec![product])
            .await?
            .pop()
            .ok_or_else(|| CatalogError::Invalid("product could not be assembled".to_owned()))
    }

    /// Attach categories and variants to a batch of products.
    async fn assemble(&self, products: Vec<Product>) -> Result<Vec<ProductResponse>, CatalogError> {
        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
        let mut variants: HashMap<ProductId, Vec<VariantResponse>> = HashMap::new();
        for variant in self.products.variants_for(&ids).await? {
            variants
                .entry(variant.product_id)
                .or_default()
                .push(variant.into());
        }
        let all = self.cache.load(self.pool).await?;
        let categories: HashMap<CategoryId, &Category> = all.iter().map(|c| (c.id, c)).collect();

        Ok(products
            .into_iter()
            .map(|p| {
                let category = categories.get(&p.category_id).map_or_else(
                    || CategorySummary {
                        id: p.category_id,
                        name: String::new(),
                        description: None,
                    },
                    |c| c.summary(),
                );
                ProductResponse {
                    variants: variants.remove(&p.id).unwrap_or_default(),
                    id: p.id,
                    name: p.name,
                    description: p.description,
                    price: p.price,
                    image_url: p.image_url,
                    video_url: p.video_url,
                    category,
                }
            })
            .collect())
    }
}

/// Roots of the category forest, children sorted by name.
fn build_tree(all: &[Category]) -> Vec<CategoryResponse> {
    let names = names_by_id(all);
    let children = children_by_parent(all);
    all.iter()
        .filter(|c| c.parent_id.is_none())
        .map(|root| nest(root, &names, &children))
        .collect()
}

/// The subtree rooted at `id`.
fn subtree(all: &[Category], id: CategoryId) -> Option<CategoryResponse> {
    let root = all.iter().find(|c| c.id == id)?;
    let names = names_by_id(all);
    let children = children_by_parent(all);
    Some(nest(root, &names, &children))
}

fn nest(
    category: &Category,
    names: &HashMap<CategoryId, &str>,
    children: &HashMap<CategoryId, Vec<&Category>>,
) -> CategoryResponse {
    let mut response = flat_response(category, names);
    response.sub_categories = children
        .get(&category.id)
        .map(|kids| kids.iter().map(|kid| nest(kid, names, children)).collect())
        .unwrap_or_default();
    response
}

fn flat_response(category: &Category, names: &HashMap<CategoryId, &str>) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        name: category.name.clone(),
        description: category.description.clone(),
        parent_id: category.parent_id,
        parent_name: category
            .parent_id
            .and_then(|p| names.get(&p))
            .map(|n| (*n).to_owned()),
        sub_categories: Vec::new(),
    }
}

fn names_by_id(all: &[Category]) -> HashMap<CategoryId, &str> {
    all.iter().map(|c| (c.id, c.name.as_str())).collect()
}

/// Input is ordered by name, so each child list is too.
fn children_by_parent(all: &[Category]) -> HashMap<CategoryId, Vec<&Category>> {
    let mut children: HashMap<CategoryId, Vec<&Category>> = HashMap::new();
    for category in all {
        if let Some(parent) = category.parent_id {
            children.entry(parent).or_default().push(category);
        }
    }
    children
}

fn required_name<'n>(value: &'n str, what: &str) -> Result<&'n str, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Invalid(format!("{what} name is required")));
    }
    Ok(trimmed)
}

fn validate_stock(stock_quantity: i32) -> Result<(), CatalogError> {
    if stock_quantity < 0 {
        return Err(CatalogError::Invalid(
            "Stock quantity cannot be negative".to_owned(),
        ));
    }
    Ok(())
}

fn name_conflict(e: RepositoryError) -> CatalogError {
    match e {
        RepositoryError::Conflict(_) => {
            CatalogError::Conflict("A category with this name already exists".to_owned())
        }
        other => other.into(),
    }
}

fn category_not_found(id: CategoryId) -> CatalogError {
    CatalogError::NotFound(format!("Category not found with id: {id}"))
}

fn product_not_found(id: ProductId) -> CatalogError {
    CatalogError::NotFound(format!("Product not found with id: {id}"))
}

fn variant_not_found(id: VariantId) -> CatalogError {
    CatalogError::NotFound(format!("Product variant not found with id: {id}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn category(id: i32, name: &str, parent: Option<i32>) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
            description: None,
            parent_id: parent.map(CategoryId::new),
        }
    }

    /// Ordered by name, as `list_all` returns them.
    fn sample() -> Vec<Category> {
        vec![
            category(6, "Baby Jewelry", Some(5)),
            category(2, "Earrings", Some(1)),
            category(5, "Kids Collection", None),
            category(4, "Necklaces", Some(3)),
            category(3, "Traditional", None),
            category(1, "Women's Jewelry", None),
        ]
    }

    #[test]
    fn test_build_tree_nests_children_under_roots() {
        let tree = build_tree(&sample());
        let names: Vec<&str> = tree.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Kids Collection", "Traditional", "Women's Jewelry"]);

        let kids = &tree[0];
        assert_eq!(kids.sub_categories.len(), 1);
        assert_eq!(kids.sub_categories[0].name, "Baby Jewelry");
        assert_eq!(
            kids.sub_categories[0].parent_name.as_deref(),
            Some("Kids Collection")
        );
        assert!(kids.parent_name.is_none());
    }

    #[test]
    fn test_subtree_lookup() {
        let all = sample();
        let traditional = subtree(&all, CategoryId::new(3)).unwrap();
        assert_eq!(
            traditional.subtree_ids(),
            vec![CategoryId::new(3), CategoryId::new(4)]
        );
        assert!(subtree(&all, CategoryId::new(99)).is_none());
    }

    #[test]
    fn test_required_name_trims() {
        assert_eq!(required_name("  Rings ", "Category").unwrap(), "Rings");
        assert!(matches!(
            required_name("   ", "Category"),
            Err(CatalogError::Invalid(msg)) if msg == "Category name is required"
        ));
    }

    #[test]
    fn test_negative_stock_rejected() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
    }
}

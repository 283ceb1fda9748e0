//! Product and variant repository.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use dream_collections_core::api::{ProductRequest, VariantDetail};
use dream_collections_core::{CategoryId, ProductId, VariantId};

use super::RepositoryError;
use crate::models::{Product, Variant};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image_url, video_url, category_id, created_at, updated_at";

/// Column a product listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Price,
    CreatedAt,
}

/// `field` or `field,asc|desc`, as accepted by the `sort` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductSort {
    pub field: SortField,
    pub descending: bool,
}

impl ProductSort {
    const fn column(self) -> &'static str {
        match self.field {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::CreatedAt => "created_at",
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);
        let field = match parts.next().unwrap_or_default() {
            "" | "id" => SortField::Id,
            "name" => SortField::Name,
            "price" => SortField::Price,
            "createdAt" | "created_at" => SortField::CreatedAt,
            other => return Err(format!("cannot sort by '{other}'")),
        };
        let descending = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("" | "asc") => false,
            Some("desc") => true,
            Some(other) => return Err(format!("unknown sort direction '{other}'")),
        };
        Ok(Self { field, descending })
    }
}

/// Filters for the product listing. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_ids: Option<Vec<CategoryId>>,
    pub name_contains: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(ids) = &self.category_ids {
            let ids: Vec<i32> = ids.iter().map(CategoryId::as_i32).collect();
            qb.push(" AND category_id = ANY(").push_bind(ids).push(")");
        }
        if let Some(name) = &self.name_contains {
            qb.push(" AND name ILIKE ")
                .push_bind(format!("%{}%", escape_like(name)));
        }
        if let Some(min) = self.min_price {
            qb.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND price <= ").push_bind(max);
        }
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(sqlx::FromRow)]
struct VariantDetailRow {
    id: VariantId,
    size: String,
    stock_quantity: i32,
    product_id: ProductId,
    product_name: String,
    price: Decimal,
    image_url: Option<String>,
}

impl From<VariantDetailRow> for VariantDetail {
    fn from(row: VariantDetailRow) -> Self {
        Self {
            id: row.id,
            size: row.size,
            stock_quantity: row.stock_quantity,
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            image_url: row.image_url,
        }
    }
}

const VARIANT_DETAIL_SELECT: &str = "SELECT v.id, v.size, v.stock_quantity, v.product_id, \
                                            p.name AS product_name, p.price, p.image_url \
                                     FROM product_variants v \
                                     JOIN products p ON p.id = v.product_id";

/// Variant details with the variant row locked until the transaction ends,
/// so its stock cannot change under a cart check.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_variant_detail(
    conn: &mut PgConnection,
    id: VariantId,
) -> Result<Option<VariantDetail>, RepositoryError> {
    let sql = format!("{VARIANT_DETAIL_SELECT} WHERE v.id = $1 FOR UPDATE OF v");
    let row = sqlx::query_as::<_, VariantDetailRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(VariantDetail::from))
}

/// Repository for products and their variants.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products plus the total number matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        filter.push_where(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY ")
            .push(sort.column())
            .push(if sort.descending { " DESC" } else { " ASC" })
            .push(", id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let products = qb.build_query_as::<Product>().fetch_all(self.pool).await?;

        Ok((products, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Variants of the given products, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants_for(&self, products: &[ProductId]) -> Result<Vec<Variant>, RepositoryError> {
        let ids: Vec<i32> = products.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, Variant>(
            "SELECT id, product_id, size, stock_quantity FROM product_variants \
             WHERE product_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a product and its inline variants in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn create(&self, req: &ProductRequest) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO products (name, description, price, image_url, video_url, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(&req.name)
            .bind(&req.description)
            .bind(req.price)
            .bind(&req.image_url)
            .bind(&req.video_url)
            .bind(req.category_id)
            .fetch_one(&mut *tx)
            .await?;

        for variant in &req.variants {
            sqlx::query(
                "INSERT INTO product_variants (product_id, size, stock_quantity) VALUES ($1, $2, $3)",
            )
            .bind(product.id)
            .bind(&variant.size)
            .bind(variant.stock_quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Overwrite a product and replace all of its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn replace(
        &self,
        id: ProductId,
        req: &ProductRequest,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE products SET name = $2, description = $3, price = $4, image_url = $5, \
                 video_url = $6, category_id = $7, updated_at = now() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&req.name)
            .bind(&req.description)
            .bind(req.price)
            .bind(&req.image_url)
            .bind(&req.video_url)
            .bind(req.category_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM product_variants WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for variant in &req.variants {
            sqlx::query(
                "INSERT INTO product_variants (product_id, size, stock_quantity) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(&variant.size)
            .bind(variant.stock_quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Delete a product together with its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if nothing was deleted.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn add_variant(
        &self,
        product: ProductId,
        size: &str,
        stock_quantity: i32,
    ) -> Result<Variant, RepositoryError> {
        sqlx::query_as::<_, Variant>(
            "INSERT INTO product_variants (product_id, size, stock_quantity) \
             SELECT id, $2, $3 FROM products WHERE id = $1 \
             RETURNING id, product_id, size, stock_quantity",
        )
        .bind(product)
        .bind(size)
        .bind(stock_quantity)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// A variant with its product's name, price and image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant_detail(&self, id: VariantId) -> Result<Option<VariantDetail>, RepositoryError> {
        let sql = format!("{VARIANT_DETAIL_SELECT} WHERE v.id = $1");
        let row = sqlx::query_as::<_, VariantDetailRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(VariantDetail::from))
    }

    /// Details for every id that exists; unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant_details(&self, ids: &[VariantId]) -> Result<Vec<VariantDetail>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(VariantId::as_i32).collect();
        let sql = format!("{VARIANT_DETAIL_SELECT} WHERE v.id = ANY($1) ORDER BY v.id");
        let rows = sqlx::query_as::<_, VariantDetailRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(VariantDetail::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    pub async fn set_stock(&self, id: VariantId, stock_quantity: i32) -> Result<Variant, RepositoryError> {
        sqlx::query_as::<_, Variant>(
            "UPDATE product_variants SET stock_quantity = $2 WHERE id = $1 \
             RETURNING id, product_id, size, stock_quantity",
        )
        .bind(id)
        .bind(stock_quantity)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parsing() {
        assert_eq!("".parse::<ProductSort>().unwrap(), ProductSort::default());
        assert_eq!(
            "price,desc".parse::<ProductSort>().unwrap(),
            ProductSort {
                field: SortField::Price,
                descending: true,
            }
        );
        assert_eq!(
            "createdAt".parse::<ProductSort>().unwrap().field,
            SortField::CreatedAt
        );
        assert!("name,sideways".parse::<ProductSort>().is_err());
        assert!("stock".parse::<ProductSort>().is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_filter_sql() {
        let filter = ProductFilter {
            category_ids: Some(vec![CategoryId::new(1)]),
            name_contains: Some("ring".to_owned()),
            min_price: Some(Decimal::ONE),
            max_price: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        filter.push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM products WHERE TRUE AND category_id = ANY($1) \
             AND name ILIKE $2 AND price >= $3"
        );
    }
}

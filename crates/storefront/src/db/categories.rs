//! Category repository.

use sqlx::PgPool;

use dream_collections_core::CategoryId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::Category;

const SUBTREE_CTE: &str = "WITH RECURSIVE subtree AS ( \
                               SELECT id FROM categories WHERE id = $1 \
                               UNION ALL \
                               SELECT c.id FROM categories c JOIN subtree s ON c.parent_id = s.id \
                           )";

/// Repository for the category tree.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every category, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, parent_id FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, parent_id FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Case-insensitive lookup by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, parent_id FROM categories WHERE lower(name) = lower($1)",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        parent: Option<CategoryId>,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description, parent_id) VALUES ($1, $2, $3) \
             RETURNING id, name, description, parent_id",
        )
        .bind(name)
        .bind(description)
        .bind(parent)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category"))?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        name: &str,
        description: Option<&str>,
        parent: Option<CategoryId>,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, description = $3, parent_id = $4 WHERE id = $1 \
             RETURNING id, name, description, parent_id",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(parent)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Whether any product sits in the category or one of its descendants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subtree_has_products(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let sql = format!(
            "{SUBTREE_CTE} SELECT EXISTS ( \
                 SELECT 1 FROM products WHERE category_id IN (SELECT id FROM subtree) \
             )"
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// Delete a category; sub-categories go with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if nothing was deleted.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

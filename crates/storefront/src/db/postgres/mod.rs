//! `PostgreSQL` implementation of the repository traits.
//!
//! Queries are checked at runtime (`sqlx::query_as` with `FromRow` row
//! types), so the crate builds without a live database.

mod carts;
mod catalog;
mod orders;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use shop_core::{CategoryId, Price};

use super::{RepositoryError, ShopStore, conflict_on_unique};
use crate::models::{Category, Product};

/// Repository backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a category, or return the existing one with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_category(&self, name: &str, slug: &str) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, catalog::CategoryRow>(
            r"
            INSERT INTO shop.category (name, slug)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, slug
            ",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category already has a
    /// product with this slug.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_product(
        &self,
        category_id: CategoryId,
        name: &str,
        slug: &str,
        description: &str,
        price: Price,
        available: bool,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, catalog::ProductRow>(
            r"
            INSERT INTO shop.product (category_id, name, slug, description, price, available)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, category_id, name, slug, description, price, available,
                      created_at, updated_at
            ",
        )
        .bind(category_id)
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(price)
        .bind(available)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product slug"))?;

        Ok(row.into())
    }
}

#[async_trait]
impl ShopStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

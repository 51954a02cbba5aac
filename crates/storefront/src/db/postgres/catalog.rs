//! Catalog queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shop_core::{CategoryId, Price, ProductId};

use super::PgStore;
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, Product};

#[derive(sqlx::FromRow)]
pub(super) struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    category_id: CategoryId,
    name: String,
    slug: String,
    description: String,
    price: Price,
    available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            available: row.available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, slug
            FROM shop.category
            ORDER BY name ASC
            ",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, slug
            FROM shop.category
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Category::from))
    }

    async fn available_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, category_id, name, slug, description, price, available,
                   created_at, updated_at
            FROM shop.product
            WHERE available AND ($1::INTEGER IS NULL OR category_id = $1)
            ORDER BY name ASC
            ",
        )
        .bind(category)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, category_id, name, slug, description, price, available,
                   created_at, updated_at
            FROM shop.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Product::from))
    }
}

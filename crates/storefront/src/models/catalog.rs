//! Catalog types.
//!
//! The catalog is read-only from the storefront's point of view; products
//! are maintained by the seeding tools or an external back office.

use chrono::{DateTime, Utc};

use shop_core::{CategoryId, Price, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A product offered in the shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Current list price. Cart and order lines copy this value.
    pub price: Price,
    /// Unavailable products are hidden from listings and cannot be added.
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Canonical detail page path.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/products/{}/{}", self.id, self.slug)
    }
}

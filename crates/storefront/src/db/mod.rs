//! Database operations for the storefront.
//!
//! # Database: `shop`
//!
//! ## Tables
//!
//! - `shop.category`, `shop.product` - Read-only catalog
//! - `shop.user` - Shopper accounts (argon2 password hashes)
//! - `shop.cart` - One cart per user or anonymous session key
//! - `shop.cart_item` - Cart lines, unique per `(cart_id, product_id)`
//! - `shop.order`, `shop.order_item` - Placed orders with snapshotted lines
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Stores
//!
//! Handlers and services talk to the database through the repository traits
//! defined here. [`PgStore`] is the production implementation;
//! [`MemoryShopStore`] keeps everything in process for tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p shop-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shop_core::{CartId, CategoryId, Email, Identity, OrderId, ProductId, Quantity, UserId};

use crate::models::{
    Cart, CartItem, Category, Order, OrderSummary, Product, ShippingInfo, User,
};

pub use memory::MemoryShopStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// How [`CartStore::upsert_item`] treats an existing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// Add the new quantity to the existing one.
    Increment,
    /// Overwrite the existing quantity.
    Replace,
}

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All categories, ordered by name.
    async fn categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Look up a category by slug.
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError>;

    /// Available products, optionally restricted to one category, ordered by name.
    async fn available_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Look up a product by id, whether or not it is available.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
}

/// Cart persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The cart owned by `owner`, if one exists.
    async fn find_cart(&self, owner: &Identity) -> Result<Option<Cart>, RepositoryError>;

    /// The cart owned by `owner`, created if missing. Never creates a second
    /// cart for the same owner.
    async fn get_or_create_cart(&self, owner: &Identity) -> Result<Cart, RepositoryError>;

    /// All lines of a cart, in the order they were first added.
    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError>;

    /// The line for `product_id`, if present.
    async fn cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Insert a line for `product`, or update the existing one according to
    /// `mode`. A new line copies `product.price`; an existing line keeps the
    /// price it was created with.
    async fn upsert_item(
        &self,
        cart_id: CartId,
        product: &Product,
        quantity: Quantity,
        mode: QuantityUpdate,
    ) -> Result<CartItem, RepositoryError>;

    /// Delete the line for `product_id`. Returns `false` if there was none.
    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;

    /// Move every line of `from` into `into`, summing quantities of shared
    /// products (capped at [`Quantity::MAX`]), then delete `from`.
    async fn merge_carts(&self, from: CartId, into: CartId) -> Result<(), RepositoryError>;

    /// Delete a cart and its lines. Returns `false` if it did not exist.
    async fn delete_cart(&self, cart_id: CartId) -> Result<bool, RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically create an order from the lines of `cart_id` and empty the
    /// cart. Returns `None`, changing nothing, if the cart has no lines.
    async fn place_order(
        &self,
        user_id: UserId,
        shipping: &ShippingInfo,
        cart_id: CartId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Look up an order with its lines.
    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders placed by `user_id`, newest first.
    async fn orders_for_user(&self, user_id: UserId)
    -> Result<Vec<OrderSummary>, RepositoryError>;
}

/// Shopper account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by id.
    async fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up a user and their password hash by login name.
    async fn user_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create a user.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn create_user(
        &self,
        username: &str,
        email: Option<&Email>,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;
}

/// Everything the storefront needs from its backing store.
#[async_trait]
pub trait ShopStore: CatalogStore + CartStore + OrderStore + UserStore {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Shared handle to a [`ShopStore`].
pub type DynShopStore = Arc<dyn ShopStore>;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

//! Cart operations.
//!
//! Every call takes the cart (or the identity that owns it) explicitly;
//! nothing is read from ambient request state.

use thiserror::Error;
use tracing::instrument;

use shop_core::{Identity, ProductId, Quantity, QuantityError, SessionKey, UserId};

use crate::db::{QuantityUpdate, RepositoryError, ShopStore};
use crate::models::{Cart, CartContents, CartItem, Product};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The requested quantity is missing or out of range.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// No product with this id exists.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The product exists but is not currently sold.
    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn ShopStore,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a dyn ShopStore) -> Self {
        Self { store }
    }

    /// The single cart for `identity`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn get_or_create_cart(&self, identity: &Identity) -> Result<Cart, CartError> {
        Ok(self.store.get_or_create_cart(identity).await?)
    }

    /// Add `quantity` units of a product.
    ///
    /// An existing line is incremented and keeps its original price; a new
    /// line captures the product's current price.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` or `CartError::ProductUnavailable`
    /// if the product cannot be bought, and `CartError::InvalidQuantity` if
    /// the line would exceed [`Quantity::MAX`]. The cart is unchanged on error.
    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    pub async fn add_item(
        &self,
        cart: &Cart,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, CartError> {
        let product = self.purchasable_product(product_id).await?;

        if let Some(existing) = self.store.cart_item(cart.id, product_id).await? {
            existing.quantity.checked_add(quantity)?;
        }

        let item = self
            .store
            .upsert_item(cart.id, &product, quantity, QuantityUpdate::Increment)
            .await
            .map_err(quantity_conflict)?;

        tracing::debug!(quantity = %item.quantity, "added to cart");
        Ok(item)
    }

    /// Set the quantity of a product line, creating it if absent.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::add_item`].
    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    pub async fn update_quantity(
        &self,
        cart: &Cart,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, CartError> {
        let product = self.purchasable_product(product_id).await?;

        let item = self
            .store
            .upsert_item(cart.id, &product, quantity, QuantityUpdate::Replace)
            .await
            .map_err(quantity_conflict)?;

        Ok(item)
    }

    /// Remove a product line. Removing a product that is not in the cart is
    /// not an error.
    ///
    /// Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    pub async fn remove_item(&self, cart: &Cart, product_id: ProductId) -> Result<bool, CartError> {
        Ok(self.store.remove_item(cart.id, product_id).await?)
    }

    /// The cart's lines, for display.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn list_items(&self, cart: &Cart) -> Result<CartContents, CartError> {
        let items = self.store.cart_items(cart.id).await?;
        Ok(CartContents {
            cart: cart.clone(),
            items,
        })
    }

    /// Move an anonymous shopper's cart into a user's cart after login.
    ///
    /// Quantities of products present in both are summed, capped at
    /// [`Quantity::MAX`]. Does nothing if the session has no cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self, session_key))]
    pub async fn adopt_session_cart(
        &self,
        session_key: SessionKey,
        user_id: UserId,
    ) -> Result<(), CartError> {
        let Some(anonymous) = self
            .store
            .find_cart(&Identity::Session(session_key))
            .await?
        else {
            return Ok(());
        };

        let user_cart = self.store.get_or_create_cart(&Identity::User(user_id)).await?;
        self.store.merge_carts(anonymous.id, user_cart.id).await?;

        tracing::info!(from = %anonymous.id, into = %user_cart.id, "merged session cart");
        Ok(())
    }

    async fn purchasable_product(&self, product_id: ProductId) -> Result<Product, CartError> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        if !product.available {
            return Err(CartError::ProductUnavailable(product_id));
        }

        Ok(product)
    }
}

fn quantity_conflict(e: RepositoryError) -> CartError {
    match e {
        RepositoryError::Conflict(_) => CartError::InvalidQuantity(QuantityError::TooLarge {
            max: Quantity::MAX,
        }),
        other => CartError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shop_core::Price;

    use super::*;
    use crate::db::{CatalogStore, MemoryShopStore};

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    async fn seeded() -> (MemoryShopStore, Product) {
        let store = MemoryShopStore::new();
        let category = store.add_category("Electronics", "electronics").await;
        let laptop = store
            .add_product(
                category.id,
                "Laptop",
                "laptop",
                Price::new(Decimal::new(1000, 0)).unwrap(),
                true,
            )
            .await;
        (store, laptop)
    }

    #[tokio::test]
    async fn test_get_or_create_cart_returns_same_cart() {
        let (store, _) = seeded().await;
        let carts = CartService::new(&store);

        for identity in [
            Identity::User(UserId::new(500)),
            Identity::Session(SessionKey::generate()),
        ] {
            let first = carts.get_or_create_cart(&identity).await.unwrap();
            let second = carts.get_or_create_cart(&identity).await.unwrap();
            assert_eq!(first.id, second.id);
            assert_eq!(first.owner, identity);
        }
        assert_eq!(store.cart_count().await, 2);
    }

    #[tokio::test]
    async fn test_add_item_to_empty_cart() {
        let (store, laptop) = seeded().await;
        let carts = CartService::new(&store);
        let cart = carts
            .get_or_create_cart(&Identity::Session(SessionKey::generate()))
            .await
            .unwrap();

        carts.add_item(&cart, laptop.id, qty(2)).await.unwrap();

        let contents = carts.list_items(&cart).await.unwrap();
        assert_eq!(contents.items.len(), 1);
        assert_eq!(contents.items[0].product_id, laptop.id);
        assert_eq!(contents.items[0].quantity.get(), 2);
        assert_eq!(contents.subtotal(), Price::from_units(2000));
    }

    #[tokio::test]
    async fn test_adding_twice_merges_into_one_line() {
        let (store, laptop) = seeded().await;
        let carts = CartService::new(&store);
        let cart = carts
            .get_or_create_cart(&Identity::User(UserId::new(500)))
            .await
            .unwrap();

        for (q1, q2) in [(1, 1), (3, 4), (10, 89)] {
            carts.remove_item(&cart, laptop.id).await.unwrap();
            carts.add_item(&cart, laptop.id, qty(q1)).await.unwrap();
            carts.add_item(&cart, laptop.id, qty(q2)).await.unwrap();

            let items = carts.list_items(&cart).await.unwrap().items;
            assert_eq!(items.len(), 1);
            assert_eq!(i64::from(items[0].quantity.get()), q1 + q2);
        }
    }

    #[tokio::test]
    async fn test_price_is_snapshotted() {
        let (store, laptop) = seeded().await;
        let carts = CartService::new(&store);
        let cart = carts
            .get_or_create_cart(&Identity::User(UserId::new(500)))
            .await
            .unwrap();

        carts.add_item(&cart, laptop.id, qty(1)).await.unwrap();
        store.set_product_price(laptop.id, Price::from_units(1500)).await;

        let items = carts.list_items(&cart).await.unwrap().items;
        assert_eq!(items[0].price, Price::from_units(1000));
        let current = store.product(laptop.id).await.unwrap().unwrap();
        assert_eq!(current.price, Price::from_units(1500));
    }

    #[tokio::test]
    async fn test_overflowing_quantity_leaves_cart_unchanged() {
        let (store, laptop) = seeded().await;
        let carts = CartService::new(&store);
        let cart = carts
            .get_or_create_cart(&Identity::User(UserId::new(500)))
            .await
            .unwrap();

        carts.add_item(&cart, laptop.id, qty(90)).await.unwrap();
        let result = carts.add_item(&cart, laptop.id, qty(10)).await;

        assert!(matches!(
            result,
            Err(CartError::InvalidQuantity(QuantityError::TooLarge { .. }))
        ));
        let items = carts.list_items(&cart).await.unwrap().items;
        assert_eq!(items[0].quantity.get(), 90);
    }

    #[tokio::test]
    async fn test_unknown_and_unavailable_products() {
        let (store, laptop) = seeded().await;
        let carts = CartService::new(&store);
        let cart = carts
            .get_or_create_cart(&Identity::User(UserId::new(500)))
            .await
            .unwrap();

        assert!(matches!(
            carts.add_item(&cart, ProductId::new(9999), qty(1)).await,
            Err(CartError::ProductNotFound(_))
        ));

        store.set_product_available(laptop.id, false).await;
        assert!(matches!(
            carts.add_item(&cart, laptop.id, qty(1)).await,
            Err(CartError::ProductUnavailable(_))
        ));
        assert!(carts.list_items(&cart).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_item_is_noop() {
        let (store, laptop) = seeded().await;
        let carts = CartService::new(&store);
        let cart = carts
            .get_or_create_cart(&Identity::User(UserId::new(500)))
            .await
            .unwrap();

        assert!(!carts.remove_item(&cart, laptop.id).await.unwrap());
        carts.add_item(&cart, laptop.id, qty(1)).await.unwrap();
        assert!(carts.remove_item(&cart, laptop.id).await.unwrap());
        assert!(carts.list_items(&cart).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_quantity_replaces() {
        let (store, laptop) = seeded().await;
        let carts = CartService::new(&store);
        let cart = carts
            .get_or_create_cart(&Identity::User(UserId::new(500)))
            .await
            .unwrap();

        carts.add_item(&cart, laptop.id, qty(5)).await.unwrap();
        let item = carts.update_quantity(&cart, laptop.id, qty(2)).await.unwrap();
        assert_eq!(item.quantity.get(), 2);
    }

    #[tokio::test]
    async fn test_adopt_session_cart() {
        let (store, laptop) = seeded().await;
        let carts = CartService::new(&store);
        let key = SessionKey::generate();
        let user_id = UserId::new(500);

        let anonymous = carts
            .get_or_create_cart(&Identity::Session(key.clone()))
            .await
            .unwrap();
        carts.add_item(&anonymous, laptop.id, qty(2)).await.unwrap();

        carts.adopt_session_cart(key, user_id).await.unwrap();

        let user_cart = carts
            .get_or_create_cart(&Identity::User(user_id))
            .await
            .unwrap();
        let items = carts.list_items(&user_cart).await.unwrap().items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity.get(), 2);
        assert_eq!(store.cart_count().await, 1);
    }
}

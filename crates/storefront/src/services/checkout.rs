//! Checkout: turning a cart into an order.

use thiserror::Error;
use tracing::instrument;

use shop_core::{Identity, OrderId, UserId};

use crate::db::{RepositoryError, ShopStore};
use crate::models::{Cart, Order, OrderSummary, ShippingErrors, ShippingForm};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout requires a signed-in user.
    #[error("checkout requires a signed-in user")]
    AnonymousCheckout,

    /// The cart has no lines.
    #[error("cannot place an order for an empty cart")]
    EmptyCart,

    /// The cart does not belong to the shopper placing the order.
    #[error("cart does not belong to this shopper")]
    CartMismatch,

    /// One or more shipping fields are missing or invalid.
    #[error(transparent)]
    InvalidShipping(#[from] ShippingErrors),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    store: &'a dyn ShopStore,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a dyn ShopStore) -> Self {
        Self { store }
    }

    /// Place an order for everything in `cart`.
    ///
    /// Every cart line becomes an order line with the same product, quantity
    /// and captured price, and the cart is emptied in the same transaction.
    /// The cart itself is kept so the shopper can continue shopping.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AnonymousCheckout` if `identity` is not a
    /// signed-in user, `CheckoutError::InvalidShipping` if the form is
    /// incomplete, and `CheckoutError::EmptyCart` if there is nothing to buy.
    /// No order is created and the cart is untouched on error.
    #[instrument(skip(self, shipping, cart), fields(cart_id = %cart.id))]
    pub async fn create_order(
        &self,
        identity: &Identity,
        shipping: &ShippingForm,
        cart: &Cart,
    ) -> Result<Order, CheckoutError> {
        let user_id = identity.user_id().ok_or(CheckoutError::AnonymousCheckout)?;
        if cart.owner != *identity {
            return Err(CheckoutError::CartMismatch);
        }

        let shipping = shipping.validate()?;

        let order = self
            .store
            .place_order(user_id, &shipping, cart.id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        tracing::info!(
            order_id = %order.id,
            items = order.items.len(),
            total = %order.total().amount(),
            "order placed"
        );

        Ok(order)
    }

    /// Look up an order placed by `user_id`.
    ///
    /// Orders belonging to other users are reported as missing.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the store fails.
    pub async fn order_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, CheckoutError> {
        let order = self.store.order(order_id).await?;
        Ok(order.filter(|order| order.user_id == user_id))
    }

    /// Orders placed by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the store fails.
    pub async fn order_history(&self, user_id: UserId) -> Result<Vec<OrderSummary>, CheckoutError> {
        Ok(self.store.orders_for_user(user_id).await?)
    }
}

//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Username/password authentication
//! - `cart` - Cart resolution and line-item changes
//! - `checkout` - Converting a cart into an order

pub mod auth;
pub mod cart;
pub mod checkout;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutService};

//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{Cart, CartContents, CartItem};
pub use catalog::{Category, Product};
pub use order::{Order, OrderItem, OrderSummary, ShippingErrors, ShippingForm, ShippingInfo};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;

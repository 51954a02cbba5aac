//! Core types for the shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod identity;
pub mod price;
pub mod quantity;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{Identity, SessionKey, SessionKeyError};
pub use price::{CurrencyCode, Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::OrderStatus;

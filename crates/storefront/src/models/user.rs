//! User domain types.

use chrono::{DateTime, Utc};

use shop_core::{Email, UserId};

/// A registered shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Optional contact email, used to pre-fill checkout.
    pub email: Option<Email>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

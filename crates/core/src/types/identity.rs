//! Shopper identity: who a cart belongs to.
//!
//! A request is made either by a signed-in user or by an anonymous visitor
//! tracked through their session. Carts are keyed on exactly one of the two.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::UserId;

/// Errors that can occur when parsing a [`SessionKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionKeyError {
    /// The key is empty.
    #[error("session key cannot be empty")]
    Empty,
    /// The key is longer than [`SessionKey::MAX_LENGTH`].
    #[error("session key must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The key contains characters outside `[A-Za-z0-9_-]`.
    #[error("session key contains invalid characters")]
    InvalidCharacters,
}

/// Opaque key identifying an anonymous shopper's cart.
///
/// Generated once per browser session and stored in the session data, so it
/// survives session id rotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    /// Maximum key length.
    pub const MAX_LENGTH: usize = 64;

    /// Generate a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a key received from storage.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionKeyError`] if the key is empty, too long, or has
    /// characters outside `[A-Za-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, SessionKeyError> {
        if s.is_empty() {
            return Err(SessionKeyError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SessionKeyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(SessionKeyError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = SessionKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

/// The party a cart is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identity {
    /// A signed-in user.
    User(UserId),
    /// An anonymous visitor.
    Session(SessionKey),
}

impl Identity {
    /// The user id, if this is an authenticated identity.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Session(_) => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Session(key) => write!(f, "session:{key}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_valid_and_distinct() {
        let a = SessionKey::generate();
        let b = SessionKey::generate();
        assert_ne!(a, b);
        assert_eq!(SessionKey::parse(a.as_str()).unwrap(), a);
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert_eq!(SessionKey::parse(""), Err(SessionKeyError::Empty));
        assert!(matches!(
            SessionKey::parse(&"k".repeat(65)),
            Err(SessionKeyError::TooLong { .. })
        ));
        assert_eq!(
            SessionKey::parse("abc;drop"),
            Err(SessionKeyError::InvalidCharacters)
        );
    }

    #[test]
    fn test_identity_accessors() {
        let user = Identity::User(UserId::new(3));
        assert_eq!(user.user_id(), Some(UserId::new(3)));

        let key = SessionKey::parse("abc123").unwrap();
        let anon = Identity::Session(key);
        assert_eq!(anon.user_id(), None);
        assert_eq!(anon.to_string(), "session:abc123");
    }

    #[test]
    fn test_session_key_serde_validates() {
        assert!(serde_json::from_str::<SessionKey>("\"a b\"").is_err());
        let key: SessionKey = serde_json::from_str("\"a-b_c\"").unwrap();
        assert_eq!(key.as_str(), "a-b_c");
    }
}

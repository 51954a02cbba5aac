//! Line-item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a [`Quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// No quantity was supplied.
    #[error("quantity is required")]
    Missing,
    /// The value is not a whole number.
    #[error("quantity must be a whole number")]
    NotANumber,
    /// The value is zero or negative.
    #[error("quantity must be at least 1")]
    NotPositive,
    /// The value exceeds [`Quantity::MAX`].
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Largest accepted quantity.
        max: u32,
    },
}

/// A positive number of units on a cart or order line, at most
/// [`Quantity::MAX`].
///
/// ```
/// use shop_core::{Quantity, QuantityError};
///
/// assert_eq!(Quantity::parse(Some("2")).map(Quantity::get), Ok(2));
/// assert_eq!(Quantity::parse(None), Err(QuantityError::Missing));
/// assert_eq!(Quantity::parse(Some("0")), Err(QuantityError::NotPositive));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// Largest quantity a single line can hold.
    pub const MAX: u32 = 99;

    /// Create a quantity from a signed integer.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for values below 1 and
    /// `QuantityError::TooLarge` for values above [`Quantity::MAX`].
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::NotPositive);
        }
        let value = u32::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .ok_or(QuantityError::TooLarge { max: Self::MAX })?;
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(QuantityError::NotPositive)
    }

    /// Parse a quantity from an optional form value.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::Missing` for an absent or blank value,
    /// `QuantityError::NotANumber` for non-integers, and the range errors of
    /// [`Quantity::new`].
    pub fn parse(raw: Option<&str>) -> Result<Self, QuantityError> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());
        let raw = raw.ok_or(QuantityError::Missing)?;
        let value = raw
            .parse::<i64>()
            .map_err(|_| QuantityError::NotANumber)?;
        Self::new(value)
    }

    /// Add two quantities, failing if the sum exceeds [`Quantity::MAX`].
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooLarge` when the sum is out of range.
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        Self::new(i64::from(self.get()) + i64::from(other.get()))
    }

    /// Add two quantities, clamping at [`Quantity::MAX`].
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        self.checked_add(other).unwrap_or(Self::max())
    }

    /// The largest quantity.
    #[must_use]
    pub fn max() -> Self {
        Self(NonZeroU32::MIN.saturating_add(Self::MAX - 1))
    }

    /// The underlying count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The count as a database integer.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        // MAX fits comfortably in i32.
        i32::try_from(self.get()).unwrap_or(i32::MAX)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

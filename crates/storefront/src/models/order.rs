//! Order domain types and shipping-form validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use shop_core::{Email, OrderId, OrderItemId, OrderStatus, Price, ProductId, Quantity, UserId};

/// Raw checkout form as submitted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShippingForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
}

/// Validated customer and shipping details stored on an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub address: String,
    pub postal_code: String,
    pub city: String,
}

/// Field-level problems found in a [`ShippingForm`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingErrors {
    errors: Vec<(&'static str, String)>,
}

impl ShippingErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push((field, message.into()));
    }

    /// Whether no problems were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    /// All `(field, message)` pairs in form order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.errors.iter().map(|(field, msg)| (*field, msg.as_str()))
    }
}

impl fmt::Display for ShippingErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid shipping details: ")?;
        for (i, (field, message)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ShippingErrors {}

/// Required text field limits, in characters.
const FIELD_LIMITS: [(&str, usize); 5] = [
    ("first_name", 50),
    ("last_name", 50),
    ("address", 250),
    ("postal_code", 20),
    ("city", 100),
];

fn required_text(
    errors: &mut ShippingErrors,
    field: &'static str,
    value: &str,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field, "This field is required.");
        return None;
    }
    let max = FIELD_LIMITS
        .iter()
        .find(|(name, _)| *name == field)
        .map_or(usize::MAX, |(_, max)| *max);
    if value.chars().count() > max {
        errors.push(field, format!("Ensure this value has at most {max} characters."));
        return None;
    }
    Some(value.to_owned())
}

impl ShippingForm {
    /// Validate every field, collecting all problems rather than stopping at
    /// the first one.
    ///
    /// # Errors
    ///
    /// Returns [`ShippingErrors`] if any field is missing, too long, or the
    /// email is malformed.
    pub fn validate(&self) -> Result<ShippingInfo, ShippingErrors> {
        let mut errors = ShippingErrors::default();

        let first_name = required_text(&mut errors, "first_name", &self.first_name);
        let last_name = required_text(&mut errors, "last_name", &self.last_name);
        let email = if self.email.trim().is_empty() {
            errors.push("email", "This field is required.");
            None
        } else {
            Email::parse(&self.email)
                .map_err(|e| errors.push("email", format!("Enter a valid email address ({e}).")))
                .ok()
        };
        let address = required_text(&mut errors, "address", &self.address);
        let postal_code = required_text(&mut errors, "postal_code", &self.postal_code);
        let city = required_text(&mut errors, "city", &self.city);

        match (first_name, last_name, email, address, postal_code, city) {
            (
                Some(first_name),
                Some(last_name),
                Some(email),
                Some(address),
                Some(postal_code),
                Some(city),
            ) if errors.is_empty() => Ok(ShippingInfo {
                first_name,
                last_name,
                email,
                address,
                postal_code,
                city,
            }),
            _ => Err(errors),
        }
    }
}

impl From<&ShippingInfo> for ShippingForm {
    fn from(info: &ShippingInfo) -> Self {
        Self {
            first_name: info.first_name.clone(),
            last_name: info.last_name.clone(),
            email: info.email.to_string(),
            address: info.address.clone(),
            postal_code: info.postal_code.clone(),
            city: info.city.clone(),
        }
    }
}

/// A placed order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping: ShippingInfo,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// One line of an order, copied from a cart line at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Product name at the time of checkout.
    pub product_name: String,
    pub quantity: Quantity,
    /// Unit price carried over from the cart line.
    pub price: Price,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Compact order row for the order history page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub item_count: u32,
    pub total: Price,
    pub created_at: DateTime<Utc>,
}

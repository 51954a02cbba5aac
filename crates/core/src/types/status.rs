//! Order status.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an order.
///
/// Orders are created by checkout in the terminal `Placed` state and are
/// never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Placed,
}

impl OrderStatus {
    /// Database and display representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "placed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(Self::Placed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_str() {
        assert_eq!("placed".parse::<OrderStatus>(), Ok(OrderStatus::Placed));
        assert_eq!(OrderStatus::Placed.to_string(), "placed");
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}

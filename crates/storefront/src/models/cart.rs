//! Cart domain types.

use chrono::{DateTime, Utc};

use shop_core::{CartId, CartItemId, Identity, Price, ProductId, Quantity};

/// A shopper's cart. There is at most one cart per [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub owner: Identity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// Current product name, joined from the catalog for display.
    pub product_name: String,
    /// Current product slug, joined from the catalog for links.
    pub product_slug: String,
    pub quantity: Quantity,
    /// Unit price captured when the product was first added.
    pub price: Price,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A cart together with its lines, as rendered on the cart page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartContents {
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

impl CartContents {
    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity.get()).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

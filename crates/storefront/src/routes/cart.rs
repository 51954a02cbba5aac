//! Cart route handlers.
//!
//! Every handler resolves the shopper's cart from the request identity (the
//! signed-in user, or the anonymous key kept in the session), then redirects
//! back to the cart page after a change.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use shop_core::{CurrencyCode, ProductId, Quantity};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, ShopperIdentity};
use crate::models::{CartContents, CartItem};
use crate::services::CartService;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub url: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
    pub update_url: String,
    pub remove_url: String,
}

impl CartItemView {
    fn new(item: &CartItem, currency: CurrencyCode) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            name: item.product_name.clone(),
            url: format!("/products/{}/{}", item.product_id, item.product_slug),
            quantity: item.quantity.get(),
            price: item.price.display(currency),
            line_total: item.line_total().display(currency),
            update_url: format!("/cart/update/{}", item.product_id),
            remove_url: format!("/cart/remove/{}", item.product_id),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    /// Build the view from a cart's contents.
    #[must_use]
    pub fn new(contents: &CartContents, currency: CurrencyCode) -> Self {
        Self {
            items: contents
                .items
                .iter()
                .map(|item| CartItemView::new(item, currency))
                .collect(),
            subtotal: contents.subtotal().display(currency),
            item_count: contents.item_count(),
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Quantity form data.
///
/// Kept as a raw string so that a missing or malformed value becomes a
/// validation error rather than a form rejection.
#[derive(Debug, Default, Deserialize)]
pub struct QuantityForm {
    pub quantity: Option<String>,
}

impl QuantityForm {
    fn quantity(&self) -> std::result::Result<Quantity, shop_core::QuantityError> {
        Quantity::parse(self.quantity.as_deref())
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/cart/detail.html")]
pub struct CartDetailTemplate {
    pub current_user: Option<String>,
    pub cart: CartView,
    pub max_quantity: u32,
}

/// Display the cart page.
///
/// Creates the cart on first visit, including for anonymous visitors.
#[instrument(skip(state, user, identity))]
pub async fn detail(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ShopperIdentity(identity): ShopperIdentity,
) -> Result<impl IntoResponse> {
    let carts = CartService::new(state.store());
    let cart = carts.get_or_create_cart(&identity).await?;
    let contents = carts.list_items(&cart).await?;

    Ok(CartDetailTemplate {
        current_user: user.map(|u| u.username),
        cart: CartView::new(&contents, state.config().currency),
        max_quantity: Quantity::MAX,
    })
}

/// Add a product to the cart, incrementing an existing line.
#[instrument(skip(state, identity, form))]
pub async fn add(
    State(state): State<AppState>,
    ShopperIdentity(identity): ShopperIdentity,
    Path(product_id): Path<ProductId>,
    Form(form): Form<QuantityForm>,
) -> Result<impl IntoResponse> {
    let quantity = form.quantity().map_err(crate::services::CartError::from)?;

    let carts = CartService::new(state.store());
    let cart = carts.get_or_create_cart(&identity).await?;
    carts.add_item(&cart, product_id, quantity).await?;

    let (product, quantity) = (product_id.to_string(), quantity.to_string());
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product.as_str()), ("quantity", quantity.as_str())]),
    );

    Ok(Redirect::to("/cart"))
}

/// Replace the quantity of a cart line.
#[instrument(skip(state, identity, form))]
pub async fn update(
    State(state): State<AppState>,
    ShopperIdentity(identity): ShopperIdentity,
    Path(product_id): Path<ProductId>,
    Form(form): Form<QuantityForm>,
) -> Result<impl IntoResponse> {
    let quantity = form.quantity().map_err(crate::services::CartError::from)?;

    let carts = CartService::new(state.store());
    let cart = carts.get_or_create_cart(&identity).await?;
    carts.update_quantity(&cart, product_id, quantity).await?;

    Ok(Redirect::to("/cart"))
}

/// Remove a product from the cart. Accepts GET and POST.
///
/// Removing a product that is not in the cart still redirects normally.
#[instrument(skip(state, identity))]
pub async fn remove(
    State(state): State<AppState>,
    ShopperIdentity(identity): ShopperIdentity,
    Path(product_id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let carts = CartService::new(state.store());
    let cart = carts.get_or_create_cart(&identity).await?;
    if carts.remove_item(&cart, product_id).await? {
        let product = product_id.to_string();
        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("product_id", product.as_str())]),
        );
    }

    Ok(Redirect::to("/cart"))
}

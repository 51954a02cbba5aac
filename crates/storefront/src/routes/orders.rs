//! Checkout and order route handlers.
//!
//! All routes require a signed-in user; anonymous shoppers are sent to the
//! login page and their session cart follows them.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use shop_core::{CurrencyCode, Identity, OrderId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order, OrderSummary, ShippingErrors, ShippingForm};
use crate::routes::cart::CartView;
use crate::services::{CartService, CheckoutError, CheckoutService};
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub status: String,
    pub placed_at: String,
    pub customer: String,
    pub email: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub items: Vec<OrderItemView>,
    pub total: String,
}

impl OrderView {
    fn new(order: &Order, currency: CurrencyCode) -> Self {
        let shipping = &order.shipping;
        Self {
            id: order.id.to_string(),
            status: order.status.to_string(),
            placed_at: order.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            customer: format!("{} {}", shipping.first_name, shipping.last_name),
            email: shipping.email.to_string(),
            address: shipping.address.clone(),
            postal_code: shipping.postal_code.clone(),
            city: shipping.city.clone(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.product_name.clone(),
                    quantity: item.quantity.get(),
                    price: item.price.display(currency),
                    line_total: item.line_total().display(currency),
                })
                .collect(),
            total: order.total().display(currency),
        }
    }
}

/// Order history row for templates.
#[derive(Clone)]
pub struct OrderSummaryView {
    pub id: String,
    pub url: String,
    pub status: String,
    pub placed_at: String,
    pub item_count: u32,
    pub total: String,
}

impl OrderSummaryView {
    fn new(summary: &OrderSummary, currency: CurrencyCode) -> Self {
        Self {
            id: summary.id.to_string(),
            url: format!("/orders/{}", summary.id),
            status: summary.status.to_string(),
            placed_at: summary.created_at.format("%Y-%m-%d").to_string(),
            item_count: summary.item_count,
            total: summary.total.display(currency),
        }
    }
}

/// Checkout form template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/order/create.html")]
pub struct OrderCreateTemplate {
    pub current_user: Option<String>,
    pub cart: CartView,
    pub form: ShippingForm,
    pub errors: ShippingErrors,
}

/// Order confirmation/detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/order/detail.html")]
pub struct OrderDetailTemplate {
    pub current_user: Option<String>,
    pub order: OrderView,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/order/list.html")]
pub struct OrderListTemplate {
    pub current_user: Option<String>,
    pub orders: Vec<OrderSummaryView>,
}

async fn checkout_page(
    state: &AppState,
    user: &CurrentUser,
    form: ShippingForm,
    errors: ShippingErrors,
) -> Result<Option<OrderCreateTemplate>> {
    let carts = CartService::new(state.store());
    let cart = carts.get_or_create_cart(&Identity::User(user.id)).await?;
    let contents = carts.list_items(&cart).await?;
    if contents.is_empty() {
        return Ok(None);
    }

    Ok(Some(OrderCreateTemplate {
        current_user: Some(user.username.clone()),
        cart: CartView::new(&contents, state.config().currency),
        form,
        errors,
    }))
}

/// Display the checkout form. An empty cart redirects to the cart page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn create_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    // Pre-fill the email from the account when there is one.
    let mut form = ShippingForm::default();
    if let Some(email) = state.store().user(user.id).await?.and_then(|u| u.email) {
        form.email = email.into_inner();
    }

    Ok(
        match checkout_page(&state, &user, form, ShippingErrors::default()).await? {
            Some(page) => page.into_response(),
            None => Redirect::to("/cart").into_response(),
        },
    )
}

/// Place an order for the signed-in user's cart.
///
/// Invalid shipping details re-render the form with field errors and a
/// `400 Bad Request` status; the cart is left untouched.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let identity = Identity::User(user.id);
    let cart = CartService::new(state.store())
        .get_or_create_cart(&identity)
        .await?;

    match CheckoutService::new(state.store())
        .create_order(&identity, &form, &cart)
        .await
    {
        Ok(order) => {
            let order_id = order.id.to_string();
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
            Ok(Redirect::to(&format!("/orders/{}", order.id)).into_response())
        }
        Err(CheckoutError::InvalidShipping(errors)) => {
            match checkout_page(&state, &user, form, errors).await? {
                Some(page) => Ok((StatusCode::BAD_REQUEST, page).into_response()),
                None => Err(CheckoutError::EmptyCart.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Display one of the signed-in user's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn detail(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let order = CheckoutService::new(state.store())
        .order_for_user(user.id, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    Ok(OrderDetailTemplate {
        current_user: Some(user.username),
        order: OrderView::new(&order, state.config().currency),
    })
}

/// Display the signed-in user's order history.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let currency = state.config().currency;
    let orders = CheckoutService::new(state.store())
        .order_history(user.id)
        .await?
        .iter()
        .map(|summary| OrderSummaryView::new(summary, currency))
        .collect();

    Ok(OrderListTemplate {
        current_user: Some(user.username),
        orders,
    })
}

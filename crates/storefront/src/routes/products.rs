//! Catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use shop_core::{CurrencyCode, ProductId};

use crate::db::ShopStore;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{Category, Product};
use crate::state::AppState;

/// Category link for the sidebar.
#[derive(Clone)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
    pub active: bool,
}

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub price: String,
    pub add_url: String,
}

impl ProductView {
    fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            url: product.url(),
            description: product.description.clone(),
            price: product.price.display(currency),
            add_url: format!("/cart/add/{}", product.id),
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product/list.html")]
pub struct ProductListTemplate {
    pub current_user: Option<String>,
    pub category: Option<String>,
    pub categories: Vec<CategoryLink>,
    pub products: Vec<ProductView>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product/detail.html")]
pub struct ProductDetailTemplate {
    pub current_user: Option<String>,
    pub product: ProductView,
}

async fn listing(
    state: &AppState,
    current_user: Option<String>,
    category: Option<Category>,
) -> Result<ProductListTemplate> {
    let store: &dyn ShopStore = state.store();
    let currency = state.config().currency;

    let categories = store
        .categories()
        .await?
        .into_iter()
        .map(|c| CategoryLink {
            active: category.as_ref().is_some_and(|current| current.id == c.id),
            url: format!("/category/{}", c.slug),
            name: c.name,
        })
        .collect();

    let products = store
        .available_products(category.as_ref().map(|c| c.id))
        .await?
        .iter()
        .map(|p| ProductView::new(p, currency))
        .collect();

    Ok(ProductListTemplate {
        current_user,
        category: category.map(|c| c.name),
        categories,
        products,
    })
}

/// Display all available products.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    listing(&state, user.map(|u| u.username), None).await
}

/// Display the available products of one category.
#[instrument(skip(state, user))]
pub async fn category(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let category = state
        .store()
        .category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?;

    listing(&state, user.map(|u| u.username), Some(category)).await
}

/// Display a product.
///
/// A stale slug redirects to the canonical URL.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path((id, slug)): Path<(ProductId, String)>,
) -> Result<Response> {
    let product = state
        .store()
        .product(id)
        .await?
        .filter(|p| p.available)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    if product.slug != slug {
        return Ok(Redirect::permanent(&product.url()).into_response());
    }

    Ok(ProductDetailTemplate {
        current_user: user.map(|u| u.username),
        product: ProductView::new(&product, state.config().currency),
    }
    .into_response())
}

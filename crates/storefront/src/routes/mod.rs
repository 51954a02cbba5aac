//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (pings the store)
//!
//! # Catalog
//! GET  /                             - Available products
//! GET  /category/{slug}              - Available products in a category
//! GET  /products/{id}/{slug}         - Product detail
//!
//! # Cart
//! GET  /cart                         - Cart page
//! POST /cart/add/{product_id}        - Add `quantity` units
//! POST /cart/update/{product_id}     - Set the line quantity
//! GET  /cart/remove/{product_id}     - Remove a line
//! POST /cart/remove/{product_id}     - Remove a line
//!
//! # Orders (requires auth)
//! GET  /orders                       - Order history
//! GET  /orders/create                - Checkout form
//! POST /orders/create                - Place order
//! GET  /orders/{id}                  - Order detail
//!
//! # Auth
//! GET  /auth/login                   - Login page
//! POST /auth/login                   - Login action
//! POST /auth/logout                  - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/category/{slug}", get(products::category))
        .route("/products/{id}/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::detail))
        .route("/add/{product_id}", post(cart::add))
        .route("/update/{product_id}", post(cart::update))
        .route("/remove/{product_id}", get(cart::remove).post(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/create", get(orders::create_page).post(orders::create))
        .route("/{id}", get(orders::detail))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
}

/// Build the complete application with session, request-id and tracing
/// layers applied.
///
/// The binary adds the Sentry layers on top; tests use this directly with an
/// in-memory session store.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    routes()
        .layer(session_layer)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::db::MemoryShopStore;

    fn test_app() -> Router {
        let config = StorefrontConfig::from_lookup(|key| match key {
            "STOREFRONT_DATABASE_URL" => Some("postgres://localhost/shop".to_string()),
            "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::new(config, Arc::new(MemoryShopStore::new()));
        app(state, MemoryStore::default())
    }

    async fn get(path: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let resp = get("/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_protected_route_redirects_with_full_path() {
        let resp = get("/orders/create").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/auth/login?next=/orders/create"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let resp = get("/no-such-page").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

//! Integration tests for the shop storefront.
//!
//! Tests drive the complete router (sessions, extractors, templates) in
//! process, backed by [`MemoryShopStore`] and an in-memory session store, so
//! no database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shop-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use shop_core::Price;
use shop_storefront::config::StorefrontConfig;
use shop_storefront::db::{DynShopStore, MemoryShopStore};
use shop_storefront::models::{Product, User};
use shop_storefront::routes;
use shop_storefront::services::AuthService;
use shop_storefront::state::AppState;

/// Name of the session cookie set by the storefront.
const SESSION_COOKIE: &str = "shop_session";

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Products seeded into every [`TestApp`].
pub struct Catalog {
    /// Available, priced at 1000.00.
    pub laptop: Product,
    /// Available, priced at 129.99.
    pub headphones: Product,
    /// Not available for purchase.
    pub discontinued: Product,
}

/// The storefront router over a seeded in-memory store.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryShopStore>,
    pub catalog: Catalog,
}

impl TestApp {
    /// Build the app and seed a small catalog.
    pub async fn new() -> Self {
        let config = StorefrontConfig::from_lookup(|key| match key {
            "STOREFRONT_DATABASE_URL" => Some("postgres://localhost/shop_test".to_string()),
            "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
            _ => None,
        })
        .unwrap();

        let store = Arc::new(MemoryShopStore::new());
        let electronics = store.add_category("Electronics", "electronics").await;
        let catalog = Catalog {
            laptop: store
                .add_product(electronics.id, "Laptop", "laptop", Price::from_units(1000), true)
                .await,
            headphones: store
                .add_product(
                    electronics.id,
                    "Headphones",
                    "headphones",
                    Price::from_cents(12_999),
                    true,
                )
                .await,
            discontinued: store
                .add_product(
                    electronics.id,
                    "Discontinued Phone",
                    "discontinued-phone",
                    Price::from_units(300),
                    false,
                )
                .await,
        };

        let shared: DynShopStore = store.clone();
        let router = routes::app(AppState::new(config, shared), MemoryStore::default());

        Self {
            router,
            store,
            catalog,
        }
    }

    /// A browser with an empty cookie jar.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Register a user with [`TEST_PASSWORD`].
    pub async fn create_user(&self, username: &str) -> User {
        let email = format!("{username}@example.com");
        AuthService::new(self.store.as_ref())
            .register(username, Some(email.as_str()), TEST_PASSWORD)
            .await
            .unwrap()
    }
}

/// A single browser: sends requests and keeps the session cookie.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    /// Send a GET request.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Send a form-encoded POST request.
    ///
    /// Values are sent as-is apart from spaces, so keep them URL-safe.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(name, value)| format!("{name}={}", value.replace(' ', "+")))
            .collect::<Vec<_>>()
            .join("&");

        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Log in through the login form.
    pub async fn login(&mut self, username: &str) -> TestResponse {
        self.post_form(
            "/auth/login",
            &[("username", username), ("password", TEST_PASSWORD)],
        )
        .await
    }

    /// Whether the client currently holds a session cookie.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let Some(pair) = value.to_str().ok().and_then(|v| v.split(';').next()) else {
                continue;
            };
            if let Some((name, value)) = pair.split_once('=')
                && name.trim() == SESSION_COOKIE
            {
                self.cookie = (!value.is_empty()).then(|| pair.trim().to_string());
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    /// Assert that this is a redirect to `path`.
    #[track_caller]
    pub fn assert_redirect(&self, path: &str) {
        assert!(
            self.status.is_redirection(),
            "expected redirect, got {}: {}",
            self.status,
            self.body
        );
        assert_eq!(self.location.as_deref(), Some(path));
    }
}

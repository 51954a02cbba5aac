//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions)
//!
//! Authentication and shopper identity are extractors rather than layers.

pub mod auth;
pub mod identity;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, set_current_user};
pub use identity::{ShopperIdentity, existing_cart_key, resolve_identity, session_cart_key};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;

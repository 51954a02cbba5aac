//! Shop storefront library.
//!
//! Catalog browsing, a session- or user-scoped cart, and checkout into
//! immutable orders. Exposed as a library so the binary, the CLI and the
//! integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

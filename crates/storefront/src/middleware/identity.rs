//! Shopper identity extractor.
//!
//! Resolves who the current cart belongs to: the signed-in user if there is
//! one, otherwise an anonymous key kept in the session. The key is created on
//! first use and stored under [`session_keys::CART_SESSION_KEY`], so it
//! survives session id rotation.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use shop_core::{Identity, SessionKey};

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// The identity the current request acts as.
#[derive(Debug, Clone)]
pub struct ShopperIdentity(pub Identity);

impl<S> FromRequestParts<S> for ShopperIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        resolve_identity(session).await.map(Self)
    }
}

/// Resolve the identity for a session, assigning an anonymous key if needed.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn resolve_identity(session: &Session) -> Result<Identity, AppError> {
    if let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
    {
        return Ok(Identity::User(user.id));
    }

    Ok(Identity::Session(session_cart_key(session).await?))
}

/// The anonymous cart key for this session, created if missing.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn session_cart_key(session: &Session) -> Result<SessionKey, AppError> {
    // An unreadable key is replaced rather than failing the request.
    if let Ok(Some(key)) = session
        .get::<SessionKey>(session_keys::CART_SESSION_KEY)
        .await
    {
        return Ok(key);
    }

    let key = SessionKey::generate();
    session
        .insert(session_keys::CART_SESSION_KEY, &key)
        .await?;
    tracing::debug!("assigned anonymous cart key");
    Ok(key)
}

/// The anonymous cart key if one was already assigned.
pub async fn existing_cart_key(session: &Session) -> Option<SessionKey> {
    session
        .get::<SessionKey>(session_keys::CART_SESSION_KEY)
        .await
        .ok()
        .flatten()
}

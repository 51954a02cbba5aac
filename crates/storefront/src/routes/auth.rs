//! Authentication route handlers.
//!
//! Username/password login. A successful login rotates the session id and
//! moves the anonymous session cart into the user's cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shop_core::SessionKey;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, existing_cart_key, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::{AuthError, AuthService, CartService};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub current_user: Option<String>,
    pub error: Option<String>,
    pub username: String,
    pub next: String,
}

/// Restrict post-login redirects to paths on this site.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path
        }
        _ => "/",
    }
}

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        current_user: user.map(|u| u.username),
        error: None,
        username: String::new(),
        next: safe_next(query.next.as_deref()).to_owned(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref()).to_owned();

    let user = match AuthService::new(state.store())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Login failed");
            let page = LoginTemplate {
                current_user: None,
                error: Some("Invalid username or password.".to_string()),
                username: form.username,
                next,
            };
            return Ok((StatusCode::UNAUTHORIZED, page).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let anonymous_key = existing_cart_key(&session).await;

    // New session id on privilege change.
    session.cycle_id().await?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;

    if let Some(key) = anonymous_key {
        CartService::new(state.store())
            .adopt_session_cart(key, user.id)
            .await?;
        session
            .remove::<SessionKey>(session_keys::CART_SESSION_KEY)
            .await?;
    }

    set_sentry_user(&user.id, Some(&user.username));
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Redirect::to(&next).into_response())
}

/// Log out and discard the session, including any anonymous cart key.
pub async fn logout(session: Session) -> Result<Redirect> {
    session.flush().await?;
    clear_sentry_user();

    Ok(Redirect::to("/"))
}

//! Shopper account commands.

use shop_storefront::db::PgStore;
use shop_storefront::services::AuthService;

use super::{CommandError, connect};

/// Create a user with a password.
///
/// # Errors
///
/// Returns an error if the input is invalid, the username is taken, or the
/// database is unreachable.
pub async fn create(
    username: &str,
    password: &str,
    email: Option<&str>,
) -> Result<(), CommandError> {
    let store = PgStore::new(connect().await?);

    let user = AuthService::new(&store)
        .register(username, email, password)
        .await?;

    tracing::info!(id = %user.id, username = %user.username, "Created user");
    Ok(())
}

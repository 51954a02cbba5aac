//! User queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shop_core::{Email, UserId};

use super::PgStore;
use crate::db::{RepositoryError, UserStore, conflict_on_unique};
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: Option<Email>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl UserStore for PgStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, created_at
            FROM shop.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(User::from))
    }

    async fn user_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT id, username, email, created_at, password_hash
            FROM shop.user
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| (r.user.into(), r.password_hash)))
    }

    async fn create_user(
        &self,
        username: &str,
        email: Option<&Email>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO shop.user (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, created_at
            ",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "username"))?;

        Ok(row.into())
    }
}

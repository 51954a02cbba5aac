//! Cart queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shop_core::{
    CartId, CartItemId, Identity, Price, ProductId, Quantity, SessionKey, UserId,
};

use super::PgStore;
use crate::db::{CartStore, QuantityUpdate, RepositoryError};
use crate::models::{Cart, CartItem, Product};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: Option<UserId>,
    session_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let owner = match (row.user_id, row.session_key) {
            (Some(user_id), None) => Identity::User(user_id),
            (None, Some(key)) => Identity::Session(SessionKey::parse(&key).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid session key on cart {}: {e}", row.id))
            })?),
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "cart {} must have exactly one owner",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: row.id,
            owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    product_name: String,
    product_slug: String,
    quantity: i32,
    price: Price,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(row.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid quantity on cart item {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_slug: row.product_slug,
            quantity,
            price: row.price,
        })
    }
}

const CART_COLUMNS: &str = "id, user_id, session_key, created_at, updated_at";

const CART_ITEM_SELECT: &str = r"
    SELECT ci.id, ci.cart_id, ci.product_id,
           p.name AS product_name, p.slug AS product_slug,
           ci.quantity, ci.price
    FROM shop.cart_item ci
    JOIN shop.product p ON p.id = ci.product_id
";

#[async_trait]
impl CartStore for PgStore {
    async fn find_cart(&self, owner: &Identity) -> Result<Option<Cart>, RepositoryError> {
        let row = match owner {
            Identity::User(user_id) => {
                sqlx::query_as::<_, CartRow>(&format!(
                    "SELECT {CART_COLUMNS} FROM shop.cart WHERE user_id = $1"
                ))
                .bind(*user_id)
                .fetch_optional(self.pool())
                .await?
            }
            Identity::Session(key) => {
                sqlx::query_as::<_, CartRow>(&format!(
                    "SELECT {CART_COLUMNS} FROM shop.cart WHERE session_key = $1"
                ))
                .bind(key.as_str())
                .fetch_optional(self.pool())
                .await?
            }
        };

        row.map(Cart::try_from).transpose()
    }

    async fn get_or_create_cart(&self, owner: &Identity) -> Result<Cart, RepositoryError> {
        // The unique owner columns make concurrent first requests converge on
        // one row.
        let row = match owner {
            Identity::User(user_id) => {
                sqlx::query_as::<_, CartRow>(&format!(
                    r"
                    INSERT INTO shop.cart (user_id)
                    VALUES ($1)
                    ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
                    RETURNING {CART_COLUMNS}
                    "
                ))
                .bind(*user_id)
                .fetch_one(self.pool())
                .await?
            }
            Identity::Session(key) => {
                sqlx::query_as::<_, CartRow>(&format!(
                    r"
                    INSERT INTO shop.cart (session_key)
                    VALUES ($1)
                    ON CONFLICT (session_key) DO UPDATE SET updated_at = now()
                    RETURNING {CART_COLUMNS}
                    "
                ))
                .bind(key.as_str())
                .fetch_one(self.pool())
                .await?
            }
        };

        Cart::try_from(row)
    }

    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "{CART_ITEM_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id ASC"
        ))
        .bind(cart_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    async fn cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "{CART_ITEM_SELECT} WHERE ci.cart_id = $1 AND ci.product_id = $2"
        ))
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(CartItem::try_from).transpose()
    }

    async fn upsert_item(
        &self,
        cart_id: CartId,
        product: &Product,
        quantity: Quantity,
        mode: QuantityUpdate,
    ) -> Result<CartItem, RepositoryError> {
        let replace = mode == QuantityUpdate::Replace;

        let (id, quantity, price): (CartItemId, i32, Price) = sqlx::query_as(
            r"
            INSERT INTO shop.cart_item AS ci (cart_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id) DO UPDATE
            SET quantity = CASE WHEN $5 THEN EXCLUDED.quantity
                                ELSE ci.quantity + EXCLUDED.quantity END,
                updated_at = now()
            RETURNING id, quantity, price
            ",
        )
        .bind(cart_id)
        .bind(product.id)
        .bind(quantity.as_i32())
        .bind(product.price)
        .bind(replace)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_check_violation()
            {
                return RepositoryError::Conflict("cart item quantity out of range".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        CartItem::try_from(CartItemRow {
            id,
            cart_id,
            product_id: product.id,
            product_name: product.name.clone(),
            product_slug: product.slug.clone(),
            quantity,
            price,
        })
    }

    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.cart_item
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn merge_carts(&self, from: CartId, into: CartId) -> Result<(), RepositoryError> {
        if from == into {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO shop.cart_item AS ci (cart_id, product_id, quantity, price)
            SELECT $2, product_id, quantity, price
            FROM shop.cart_item
            WHERE cart_id = $1
            ON CONFLICT (cart_id, product_id) DO UPDATE
            SET quantity = LEAST(ci.quantity + EXCLUDED.quantity, $3),
                updated_at = now()
            ",
        )
        .bind(from)
        .bind(into)
        .bind(Quantity::max().as_i32())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM shop.cart WHERE id = $1")
            .bind(from)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn delete_cart(&self, cart_id: CartId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart WHERE id = $1")
            .bind(cart_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

//! Order queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shop_core::{
    CartId, CartItemId, Email, OrderId, OrderItemId, OrderStatus, Price, ProductId, Quantity, UserId,
};

use super::PgStore;
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Order, OrderItem, OrderSummary, ShippingInfo};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    first_name: String,
    last_name: String,
    email: Email,
    address: String,
    postal_code: String,
    city: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status = parse_status(self.id, &self.status)?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            shipping: ShippingInfo {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                address: self.address,
                postal_code: self.postal_code,
                city: self.city,
            },
            status,
            items,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    price: Price,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(row.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid quantity on order item {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity,
            price: row.price,
        })
    }
}

/// A cart line removed from the cart by checkout.
#[derive(sqlx::FromRow)]
struct CheckoutLineRow {
    id: CartItemId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    price: Price,
}

#[derive(sqlx::FromRow)]
struct OrderSummaryRow {
    id: OrderId,
    status: String,
    item_count: i64,
    total: Price,
    created_at: DateTime<Utc>,
}

fn parse_status(id: OrderId, status: &str) -> Result<OrderStatus, RepositoryError> {
    status.parse::<OrderStatus>().map_err(|e| {
        RepositoryError::DataCorruption(format!("order {id}: {e}"))
    })
}

const ORDER_COLUMNS: &str = "id, user_id, first_name, last_name, email, address, postal_code, city, status, created_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, price";

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(
        &self,
        user_id: UserId,
        shipping: &ShippingInfo,
        cart_id: CartId,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // The order is built from exactly the rows this statement removes, so
        // a line committed concurrently either makes it into the order or
        // stays in the cart.
        let mut lines = sqlx::query_as::<_, CheckoutLineRow>(
            r"
            DELETE FROM shop.cart_item ci
            USING shop.product p
            WHERE ci.cart_id = $1 AND p.id = ci.product_id
            RETURNING ci.id, ci.product_id, p.name AS product_name, ci.quantity, ci.price
            ",
        )
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Ok(None);
        }
        lines.sort_by_key(|line| line.id);

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.order
                (user_id, first_name, last_name, email, address, postal_code, city, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(&shipping.first_name)
        .bind(&shipping.last_name)
        .bind(&shipping.email)
        .bind(&shipping.address)
        .bind(&shipping.postal_code)
        .bind(&shipping.city)
        .bind(OrderStatus::Placed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let row = sqlx::query_as::<_, OrderItemRow>(&format!(
                r"
                INSERT INTO shop.order_item (order_id, product_id, product_name, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {ORDER_ITEM_COLUMNS}
                "
            ))
            .bind(order.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::try_from(row)?);
        }

        let order = order.into_order(items)?;
        tx.commit().await?;

        Ok(Some(order))
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM shop.order_item WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(id)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        row.into_order(items).map(Some)
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT o.id, o.status, o.created_at,
                   COALESCE(SUM(oi.quantity), 0)::BIGINT AS item_count,
                   COALESCE(SUM(oi.quantity * oi.price), 0)::NUMERIC(12, 2) AS total
            FROM shop.order o
            LEFT JOIN shop.order_item oi ON oi.order_id = o.id
            WHERE o.user_id = $1
            GROUP BY o.id
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderSummary {
                    id: row.id,
                    status: parse_status(row.id, &row.status)?,
                    item_count: u32::try_from(row.item_count).unwrap_or(u32::MAX),
                    total: row.total,
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use shop_core::{Identity, SessionKey};
    use uuid::Uuid;

    use super::*;
    use crate::db::{CartStore, QuantityUpdate, UserStore, create_pool};

    async fn test_store() -> PgStore {
        let url = std::env::var("STOREFRONT_TEST_DATABASE_URL").unwrap();
        let pool = create_pool(&SecretString::from(url)).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        PgStore::new(pool)
    }

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            email: Email::parse("test@example.com").unwrap(),
            address: "1 Street".to_owned(),
            postal_code: "12345".to_owned(),
            city: "Almaty".to_owned(),
        }
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL at STOREFRONT_TEST_DATABASE_URL"]
    async fn test_lines_added_during_checkout_are_never_lost() {
        let store = test_store().await;
        let run = Uuid::new_v4().simple().to_string();
        let one = Quantity::new(1).unwrap();

        let category = store
            .upsert_category("Checkout race", &format!("race-{run}"))
            .await
            .unwrap();
        let mut products = Vec::new();
        for n in 0..20 {
            let product = store
                .create_product(
                    category.id,
                    &format!("Item {n}"),
                    &format!("item-{run}-{n}"),
                    "",
                    Price::from_units(10),
                    true,
                )
                .await
                .unwrap();
            products.push(product);
        }

        let user = store
            .create_user(&format!("race-{run}"), None, "hash")
            .await
            .unwrap();
        let cart = store
            .get_or_create_cart(&Identity::Session(SessionKey::generate()))
            .await
            .unwrap();
        let (first, rest) = products.split_first().unwrap();
        store
            .upsert_item(cart.id, first, one, QuantityUpdate::Increment)
            .await
            .unwrap();

        let address = shipping();
        let (order, ()) = tokio::join!(store.place_order(user.id, &address, cart.id), async {
            for product in rest {
                store
                    .upsert_item(cart.id, product, one, QuantityUpdate::Increment)
                    .await
                    .unwrap();
            }
        });

        let order = order.unwrap().unwrap();
        let remaining = store.cart_items(cart.id).await.unwrap();
        assert!(order.items.iter().any(|item| item.product_id == first.id));
        assert_eq!(order.items.len() + remaining.len(), products.len());

        let stored = store.order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items, order.items);
    }
}

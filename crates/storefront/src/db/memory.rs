//! In-process implementation of the repository traits.
//!
//! Used by tests and by `shop-storefront` demos that run without a
//! database. Mirrors the constraints enforced by the `PostgreSQL` schema:
//! one cart per owner, one line per product per cart, quantities within
//! `1..=Quantity::MAX`, and atomic checkout.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use shop_core::{
    CartId, CartItemId, CategoryId, Email, Identity, OrderId, OrderItemId, OrderStatus, Price,
    ProductId, Quantity, UserId,
};

use super::{
    CartStore, CatalogStore, OrderStore, QuantityUpdate, RepositoryError, ShopStore, UserStore,
};
use crate::models::{
    Cart, CartItem, Category, Order, OrderItem, OrderSummary, Product, ShippingInfo, User,
};

/// Cart line as stored; name and slug are joined from the product on read.
#[derive(Debug, Clone)]
struct StoredCartItem {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: Quantity,
    price: Price,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i32,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    users: BTreeMap<UserId, (User, String)>,
    carts: BTreeMap<CartId, Cart>,
    cart_items: BTreeMap<CartItemId, StoredCartItem>,
    orders: BTreeMap<OrderId, Order>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn joined(&self, item: &StoredCartItem) -> Result<CartItem, RepositoryError> {
        let product = self.products.get(&item.product_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "cart item {} references missing product {}",
                item.id, item.product_id
            ))
        })?;

        Ok(CartItem {
            id: item.id,
            cart_id: item.cart_id,
            product_id: item.product_id,
            product_name: product.name.clone(),
            product_slug: product.slug.clone(),
            quantity: item.quantity,
            price: item.price,
        })
    }

    fn lines(&self, cart_id: CartId) -> impl Iterator<Item = &StoredCartItem> {
        self.cart_items
            .values()
            .filter(move |item| item.cart_id == cart_id)
    }

    fn line_id(&self, cart_id: CartId, product_id: ProductId) -> Option<CartItemId> {
        self.lines(cart_id)
            .find(|item| item.product_id == product_id)
            .map(|item| item.id)
    }

    fn find_cart(&self, owner: &Identity) -> Option<&Cart> {
        self.carts.values().find(|cart| &cart.owner == owner)
    }

    fn drop_cart_lines(&mut self, cart_id: CartId) {
        self.cart_items.retain(|_, item| item.cart_id != cart_id);
    }
}

/// Repository that keeps all data in memory behind an async lock.
#[derive(Debug, Default)]
pub struct MemoryShopStore {
    state: RwLock<MemoryState>,
}

impl MemoryShopStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category.
    pub async fn add_category(&self, name: &str, slug: &str) -> Category {
        let mut state = self.state.write().await;
        let category = Category {
            id: CategoryId::new(state.next_id()),
            name: name.to_owned(),
            slug: slug.to_owned(),
        };
        state.categories.insert(category.id, category.clone());
        category
    }

    /// Add a product.
    pub async fn add_product(
        &self,
        category_id: CategoryId,
        name: &str,
        slug: &str,
        price: Price,
        available: bool,
    ) -> Product {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_id()),
            category_id,
            name: name.to_owned(),
            slug: slug.to_owned(),
            description: String::new(),
            price,
            available,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        product
    }

    /// Change a product's list price. Returns `false` if it does not exist.
    pub async fn set_product_price(&self, id: ProductId, price: Price) -> bool {
        let mut state = self.state.write().await;
        state.products.get_mut(&id).is_some_and(|product| {
            product.price = price;
            product.updated_at = Utc::now();
            true
        })
    }

    /// Mark a product available or unavailable. Returns `false` if it does
    /// not exist.
    pub async fn set_product_available(&self, id: ProductId, available: bool) -> bool {
        let mut state = self.state.write().await;
        state.products.get_mut(&id).is_some_and(|product| {
            product.available = available;
            product.updated_at = Utc::now();
            true
        })
    }

    /// Number of carts currently stored.
    pub async fn cart_count(&self) -> usize {
        self.state.read().await.carts.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryShopStore {
    async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .find(|category| category.slug == slug)
            .cloned())
    }

    async fn available_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.available && category.is_none_or(|id| p.category_id == id))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryShopStore {
    async fn find_cart(&self, owner: &Identity) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.state.read().await.find_cart(owner).cloned())
    }

    async fn get_or_create_cart(&self, owner: &Identity) -> Result<Cart, RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(cart) = state.find_cart(owner) {
            return Ok(cart.clone());
        }

        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(state.next_id()),
            owner: owner.clone(),
            created_at: now,
            updated_at: now,
        };
        state.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let state = self.state.read().await;
        state.lines(cart_id).map(|item| state.joined(item)).collect()
    }

    async fn cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let state = self.state.read().await;
        state
            .lines(cart_id)
            .find(|item| item.product_id == product_id)
            .map(|item| state.joined(item))
            .transpose()
    }

    async fn upsert_item(
        &self,
        cart_id: CartId,
        product: &Product,
        quantity: Quantity,
        mode: QuantityUpdate,
    ) -> Result<CartItem, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.carts.contains_key(&cart_id) {
            return Err(RepositoryError::NotFound);
        }
        if !state.products.contains_key(&product.id) {
            return Err(RepositoryError::NotFound);
        }

        let id = match state.line_id(cart_id, product.id) {
            Some(id) => {
                let item = state
                    .cart_items
                    .get_mut(&id)
                    .ok_or(RepositoryError::NotFound)?;
                item.quantity = match mode {
                    QuantityUpdate::Replace => quantity,
                    QuantityUpdate::Increment => item.quantity.checked_add(quantity).map_err(
                        |_| RepositoryError::Conflict("cart item quantity out of range".to_owned()),
                    )?,
                };
                id
            }
            None => {
                let id = CartItemId::new(state.next_id());
                state.cart_items.insert(
                    id,
                    StoredCartItem {
                        id,
                        cart_id,
                        product_id: product.id,
                        quantity,
                        price: product.price,
                    },
                );
                id
            }
        };

        if let Some(cart) = state.carts.get_mut(&cart_id) {
            cart.updated_at = Utc::now();
        }

        let item = state
            .cart_items
            .get(&id)
            .ok_or(RepositoryError::NotFound)?;
        state.joined(item)
    }

    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state
            .line_id(cart_id, product_id)
            .and_then(|id| state.cart_items.remove(&id))
            .is_some())
    }

    async fn merge_carts(&self, from: CartId, into: CartId) -> Result<(), RepositoryError> {
        if from == into {
            return Ok(());
        }

        let mut state = self.state.write().await;
        if !state.carts.contains_key(&into) {
            return Err(RepositoryError::NotFound);
        }

        let incoming: Vec<StoredCartItem> = state.lines(from).cloned().collect();
        for line in incoming {
            match state.line_id(into, line.product_id) {
                Some(id) => {
                    if let Some(existing) = state.cart_items.get_mut(&id) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => {
                    let id = CartItemId::new(state.next_id());
                    state.cart_items.insert(
                        id,
                        StoredCartItem {
                            id,
                            cart_id: into,
                            ..line
                        },
                    );
                }
            }
        }

        state.drop_cart_lines(from);
        state.carts.remove(&from);
        Ok(())
    }

    async fn delete_cart(&self, cart_id: CartId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        state.drop_cart_lines(cart_id);
        Ok(state.carts.remove(&cart_id).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryShopStore {
    async fn place_order(
        &self,
        user_id: UserId,
        shipping: &ShippingInfo,
        cart_id: CartId,
    ) -> Result<Option<Order>, RepositoryError> {
        // The write lock is held for the whole checkout, which gives the same
        // all-or-nothing behaviour as the database transaction.
        let mut state = self.state.write().await;

        let lines = state
            .lines(cart_id)
            .map(|item| state.joined(item))
            .collect::<Result<Vec<_>, _>>()?;
        if lines.is_empty() {
            return Ok(None);
        }

        let order_id = OrderId::new(state.next_id());
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            items.push(OrderItem {
                id: OrderItemId::new(state.next_id()),
                order_id,
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                price: line.price,
            });
        }

        let order = Order {
            id: order_id,
            user_id,
            shipping: shipping.clone(),
            status: OrderStatus::Placed,
            items,
            created_at: Utc::now(),
        };
        state.orders.insert(order.id, order.clone());
        state.drop_cart_lines(cart_id);

        Ok(Some(order))
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .rev()
            .filter(|order| order.user_id == user_id)
            .map(|order| OrderSummary {
                id: order.id,
                status: order.status,
                item_count: order.items.iter().map(|item| item.quantity.get()).sum(),
                total: order.total(),
                created_at: order.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryShopStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn user_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|(user, _)| user.username == username)
            .cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        email: Option<&Email>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|(user, _)| user.username == username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(state.next_id()),
            username: username.to_owned(),
            email: email.cloned(),
            created_at: Utc::now(),
        };
        state
            .users
            .insert(user.id, (user.clone(), password_hash.to_owned()));
        Ok(user)
    }
}

#[async_trait]
impl ShopStore for MemoryShopStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shop_core::SessionKey;

    use super::*;

    async fn store_with_product() -> (MemoryShopStore, Product) {
        let store = MemoryShopStore::new();
        let category = store.add_category("Tea", "tea").await;
        let product = store
            .add_product(category.id, "Green Tea", "green-tea", Price::from_units(5), true)
            .await;
        (store, product)
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
    async fn test_get_or_create_cart_is_idempotent() {
        let store = MemoryShopStore::new();
        let owner = Identity::Session(SessionKey::generate());
        let first = store.get_or_create_cart(&owner).await.unwrap();
        let second = store.get_or_create_cart(&owner).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.cart_count().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_original_price_on_increment() {
        let (store, product) = store_with_product().await;
        let cart = store
            .get_or_create_cart(&Identity::User(UserId::new(100)))
            .await
            .unwrap();

        let one = Quantity::new(1).unwrap();
        store
            .upsert_item(cart.id, &product, one, QuantityUpdate::Increment)
            .await
            .unwrap();
        store.set_product_price(product.id, Price::from_units(9)).await;
        let repriced = store.product(product.id).await.unwrap().unwrap();
        let item = store
            .upsert_item(cart.id, &repriced, one, QuantityUpdate::Increment)
            .await
            .unwrap();

        assert_eq!(item.quantity.get(), 2);
        assert_eq!(item.price, Price::from_units(5));
    }

    #[tokio::test]
    async fn test_increment_past_max_is_a_conflict() {
        let (store, product) = store_with_product().await;
        let cart = store
            .get_or_create_cart(&Identity::User(UserId::new(100)))
            .await
            .unwrap();
        store
            .upsert_item(cart.id, &product, Quantity::max(), QuantityUpdate::Increment)
            .await
            .unwrap();

        let result = store
            .upsert_item(
                cart.id,
                &product,
                Quantity::new(1).unwrap(),
                QuantityUpdate::Increment,
            )
            .await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_merge_sums_and_caps_quantities() {
        let (store, product) = store_with_product().await;
        let anon = store
            .get_or_create_cart(&Identity::Session(SessionKey::generate()))
            .await
            .unwrap();
        let user = store
            .get_or_create_cart(&Identity::User(UserId::new(100)))
            .await
            .unwrap();

        store
            .upsert_item(anon.id, &product, Quantity::new(60).unwrap(), QuantityUpdate::Increment)
            .await
            .unwrap();
        store
            .upsert_item(user.id, &product, Quantity::new(50).unwrap(), QuantityUpdate::Increment)
            .await
            .unwrap();

        store.merge_carts(anon.id, user.id).await.unwrap();

        let items = store.cart_items(user.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, Quantity::max());
        assert!(store.find_cart(&anon.owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_order_empties_cart() {
        let (store, product) = store_with_product().await;
        let user_id = UserId::new(100);
        let cart = store
            .get_or_create_cart(&Identity::User(user_id))
            .await
            .unwrap();

        assert!(store
            .place_order(user_id, &shipping(), cart.id)
            .await
            .unwrap()
            .is_none());

        store
            .upsert_item(cart.id, &product, Quantity::new(3).unwrap(), QuantityUpdate::Increment)
            .await
            .unwrap();
        let order = store
            .place_order(user_id, &shipping(), cart.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_name, "Green Tea");
        assert_eq!(order.total(), Price::from_units(15));
        assert!(store.cart_items(cart.id).await.unwrap().is_empty());

        let history = store.orders_for_user(user_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].item_count, 3);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryShopStore::new();
        store.create_user("alice", None, "hash").await.unwrap();
        let result = store.create_user("alice", None, "hash").await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }
}

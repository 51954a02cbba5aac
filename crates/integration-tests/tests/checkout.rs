//! Login, cart adoption and checkout.

use axum::http::StatusCode;

use shop_integration_tests::{TestApp, TestClient};

const SHIPPING: &[(&str, &str)] = &[
    ("first_name", "Alice"),
    ("last_name", "Smith"),
    ("email", "alice@example.com"),
    ("address", "1 Main Street"),
    ("postal_code", "050000"),
    ("city", "Almaty"),
];

async fn add(client: &mut TestClient, product_id: impl std::fmt::Display, quantity: &str) {
    client
        .post_form(&format!("/cart/add/{product_id}"), &[("quantity", quantity)])
        .await
        .assert_redirect("/cart");
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let app = TestApp::new().await;
    let mut client = app.client();
    add(&mut client, app.catalog.laptop.id, "1").await;

    client
        .get("/orders/create")
        .await
        .assert_redirect("/auth/login?next=/orders/create");

    client
        .post_form("/orders/create", SHIPPING)
        .await
        .assert_redirect("/auth/login?next=/orders/create");

    client
        .get("/orders")
        .await
        .assert_redirect("/auth/login?next=/orders");
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let app = TestApp::new().await;
    app.create_user("alice").await;
    let mut client = app.client();

    let resp = client
        .post_form(
            "/auth/login",
            &[("username", "alice"), ("password", "wrong password")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.body.contains("Invalid username or password."));
}

#[tokio::test]
async fn test_login_redirects_to_local_next_only() {
    let app = TestApp::new().await;
    app.create_user("alice").await;

    let mut client = app.client();
    client
        .post_form(
            "/auth/login",
            &[
                ("username", "alice"),
                ("password", "correct horse battery"),
                ("next", "/orders/create"),
            ],
        )
        .await
        .assert_redirect("/orders/create");

    let mut client = app.client();
    client
        .post_form(
            "/auth/login",
            &[
                ("username", "alice"),
                ("password", "correct horse battery"),
                ("next", "//evil.example"),
            ],
        )
        .await
        .assert_redirect("/");
}

#[tokio::test]
async fn test_login_adopts_anonymous_cart() {
    let app = TestApp::new().await;
    app.create_user("alice").await;
    let mut client = app.client();

    add(&mut client, app.catalog.laptop.id, "2").await;
    client.login("alice").await.assert_redirect("/");

    let resp = client.get("/cart").await;
    assert!(resp.body.contains("Laptop"));
    assert!(resp.body.contains("$2000.00"));
    assert_eq!(app.store.cart_count().await, 1);
}

#[tokio::test]
async fn test_login_merges_into_existing_user_cart() {
    let app = TestApp::new().await;
    app.create_user("alice").await;

    // Earlier visit, signed in on another browser
    let mut laptop_browser = app.client();
    laptop_browser.login("alice").await.assert_redirect("/");
    add(&mut laptop_browser, app.catalog.laptop.id, "1").await;

    let mut phone_browser = app.client();
    add(&mut phone_browser, app.catalog.laptop.id, "2").await;
    add(&mut phone_browser, app.catalog.headphones.id, "1").await;
    phone_browser.login("alice").await.assert_redirect("/");

    let resp = phone_browser.get("/cart").await;
    assert!(resp.body.contains("$3000.00"));
    assert!(resp.body.contains("Headphones"));
    assert_eq!(app.store.cart_count().await, 1);
}

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let app = TestApp::new().await;
    app.create_user("alice").await;
    let mut client = app.client();

    add(&mut client, app.catalog.laptop.id, "2").await;
    add(&mut client, app.catalog.headphones.id, "1").await;
    client.login("alice").await.assert_redirect("/");

    let resp = client.get("/orders/create").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("alice@example.com"));

    let resp = client.post_form("/orders/create", SHIPPING).await;
    assert!(resp.status.is_redirection(), "{}", resp.body);
    let order_url = resp.location.clone().unwrap();
    assert!(order_url.starts_with("/orders/"));

    let resp = client.get(&order_url).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Laptop"));
    assert!(resp.body.contains("Headphones"));
    assert!(resp.body.contains("Almaty"));
    assert!(resp.body.contains("$2129.99"));

    let resp = client.get("/cart").await;
    assert!(resp.body.contains("Your cart is empty"));

    let resp = client.get("/orders").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("$2129.99"));
}

#[tokio::test]
async fn test_order_keeps_price_paid() {
    let app = TestApp::new().await;
    app.create_user("alice").await;
    let mut client = app.client();
    client.login("alice").await.assert_redirect("/");

    add(&mut client, app.catalog.laptop.id, "1").await;
    let resp = client.post_form("/orders/create", SHIPPING).await;
    let order_url = resp.location.clone().unwrap();

    app.store
        .set_product_price(app.catalog.laptop.id, shop_core::Price::from_units(1500))
        .await;

    let resp = client.get(&order_url).await;
    assert!(resp.body.contains("$1000.00"));
    assert!(!resp.body.contains("$1500.00"));
}

#[tokio::test]
async fn test_checkout_with_empty_cart() {
    let app = TestApp::new().await;
    app.create_user("alice").await;
    let mut client = app.client();
    client.login("alice").await.assert_redirect("/");

    client.get("/orders/create").await.assert_redirect("/cart");

    let resp = client.post_form("/orders/create", SHIPPING).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_shipping_rerenders_form() {
    let app = TestApp::new().await;
    app.create_user("alice").await;
    let mut client = app.client();
    client.login("alice").await.assert_redirect("/");
    add(&mut client, app.catalog.laptop.id, "1").await;

    let resp = client
        .post_form(
            "/orders/create",
            &[
                ("first_name", "Alice"),
                ("last_name", ""),
                ("email", "not-an-email"),
                ("address", "1 Main Street"),
                ("postal_code", "050000"),
                ("city", "Almaty"),
            ],
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body.contains("not-an-email"));
    assert!(resp.body.contains("class=\"error\""));

    // Nothing was ordered
    let resp = client.get("/cart").await;
    assert!(resp.body.contains("Laptop"));
}

#[tokio::test]
async fn test_orders_are_private() {
    let app = TestApp::new().await;
    app.create_user("alice").await;
    app.create_user("bob").await;

    let mut alice = app.client();
    alice.login("alice").await.assert_redirect("/");
    add(&mut alice, app.catalog.laptop.id, "1").await;
    let order_url = alice
        .post_form("/orders/create", SHIPPING)
        .await
        .location
        .unwrap();

    let mut bob = app.client();
    bob.login("bob").await.assert_redirect("/");
    let resp = bob.get(&order_url).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = bob.get("/orders").await;
    assert!(resp.body.contains("You have not placed any orders yet."));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new().await;
    app.create_user("alice").await;
    let mut client = app.client();
    client.login("alice").await.assert_redirect("/");

    assert_eq!(client.get("/orders").await.status, StatusCode::OK);

    client.post_form("/auth/logout", &[]).await.assert_redirect("/");

    client
        .get("/orders")
        .await
        .assert_redirect("/auth/login?next=/orders");
}

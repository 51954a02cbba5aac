//! Cart flows for anonymous shoppers.

use axum::http::StatusCode;

use shop_integration_tests::TestApp;

fn add_path(id: impl std::fmt::Display) -> String {
    format!("/cart/add/{id}")
}

#[tokio::test]
async fn test_empty_cart_page() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let resp = client.get("/cart").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_add_item_redirects_to_cart() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let laptop = &app.catalog.laptop;

    let resp = client
        .post_form(&add_path(laptop.id), &[("quantity", "2")])
        .await;
    resp.assert_redirect("/cart");
    assert!(client.has_session());

    let resp = client.get("/cart").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Laptop"));
    assert!(resp.body.contains("$2000.00"));
}

#[tokio::test]
async fn test_adding_again_increments_quantity() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let laptop = &app.catalog.laptop;

    client
        .post_form(&add_path(laptop.id), &[("quantity", "1")])
        .await
        .assert_redirect("/cart");
    client
        .post_form(&add_path(laptop.id), &[("quantity", "2")])
        .await
        .assert_redirect("/cart");

    let resp = client.get("/cart").await;
    assert!(resp.body.contains("$3000.00"));
    assert_eq!(app.store.cart_count().await, 1);
}

#[tokio::test]
async fn test_update_replaces_quantity() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let headphones = &app.catalog.headphones;

    client
        .post_form(&add_path(headphones.id), &[("quantity", "4")])
        .await
        .assert_redirect("/cart");
    client
        .post_form(&format!("/cart/update/{}", headphones.id), &[("quantity", "1")])
        .await
        .assert_redirect("/cart");

    let resp = client.get("/cart").await;
    assert!(resp.body.contains("$129.99"));
    assert!(!resp.body.contains("$519.96"));
}

#[tokio::test]
async fn test_invalid_quantities_are_rejected() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let path = add_path(app.catalog.laptop.id);

    for fields in [
        &[][..],
        &[("quantity", "")][..],
        &[("quantity", "0")][..],
        &[("quantity", "-2")][..],
        &[("quantity", "abc")][..],
        &[("quantity", "100")][..],
    ] {
        let resp = client.post_form(&path, fields).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "fields: {fields:?}");
    }

    let resp = client.get("/cart").await;
    assert!(resp.body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_quantity_overflow_is_rejected() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let path = add_path(app.catalog.laptop.id);

    client
        .post_form(&path, &[("quantity", "60")])
        .await
        .assert_redirect("/cart");

    let resp = client.post_form(&path, &[("quantity", "60")]).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    // Line left untouched
    let resp = client.get("/cart").await;
    assert!(resp.body.contains("$60000.00"));
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let resp = client
        .post_form(&add_path(9999), &[("quantity", "1")])
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_unavailable_product_is_conflict() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let resp = client
        .post_form(&add_path(app.catalog.discontinued.id), &[("quantity", "1")])
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_remove_item() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let laptop = &app.catalog.laptop;
    let headphones = &app.catalog.headphones;

    client
        .post_form(&add_path(laptop.id), &[("quantity", "1")])
        .await
        .assert_redirect("/cart");
    client
        .post_form(&add_path(headphones.id), &[("quantity", "1")])
        .await
        .assert_redirect("/cart");

    client
        .post_form(&format!("/cart/remove/{}", laptop.id), &[])
        .await
        .assert_redirect("/cart");

    let resp = client.get("/cart").await;
    assert!(!resp.body.contains("Laptop"));
    assert!(resp.body.contains("Headphones"));

    // GET works too, and removing a missing line is not an error
    client
        .get(&format!("/cart/remove/{}", headphones.id))
        .await
        .assert_redirect("/cart");
    client
        .get(&format!("/cart/remove/{}", headphones.id))
        .await
        .assert_redirect("/cart");

    let resp = client.get("/cart").await;
    assert!(resp.body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_carts_are_isolated_between_sessions() {
    let app = TestApp::new().await;
    let mut alice = app.client();
    let mut bob = app.client();

    alice
        .post_form(&add_path(app.catalog.laptop.id), &[("quantity", "1")])
        .await
        .assert_redirect("/cart");

    let resp = bob.get("/cart").await;
    assert!(resp.body.contains("Your cart is empty"));

    let resp = alice.get("/cart").await;
    assert!(resp.body.contains("Laptop"));
}

#[tokio::test]
async fn test_line_keeps_price_from_when_it_was_added() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let laptop = &app.catalog.laptop;

    client
        .post_form(&add_path(laptop.id), &[("quantity", "1")])
        .await
        .assert_redirect("/cart");
    assert!(
        app.store
            .set_product_price(laptop.id, shop_core::Price::from_units(1200))
            .await
    );

    let resp = client.get("/cart").await;
    assert!(resp.body.contains("$1000.00"));
    assert!(!resp.body.contains("$1200.00"));
}

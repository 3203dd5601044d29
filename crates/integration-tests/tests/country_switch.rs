//! Choosing and switching the shopping country through the router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use shopfront_integration_tests::{TestStore, two_country_preference};

async fn store_with_mug() -> TestStore {
    let store = TestStore::start(two_country_preference()).await;
    store
        .mock_product(json!({"_id": "p1", "productName": "Mug", "productPrice": 12}))
        .await;
    store
}

#[tokio::test]
async fn test_first_choice_is_saved() {
    let mut store = store_with_mug().await;

    let chosen = store.post_form("/country/select", "country=bd").await;
    assert_eq!(chosen.status, StatusCode::SEE_OTHER);
    assert_eq!(chosen.location(), Some("/"));

    let added = store.post_form("/cart/add", "product_id=p1").await;
    assert_eq!(added.header("hx-trigger"), Some("cart-updated"));
    assert!(store.get("/cart").await.body.contains("৳12.00"));
}

#[tokio::test]
async fn test_unknown_country_is_refused() {
    let mut store = store_with_mug().await;

    let refused = store.post_form("/country/select", "country=fr").await;

    assert_eq!(refused.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_changing_region_with_items_asks_first() {
    let mut store = store_with_mug().await;
    store.post_form("/country/select", "country=bd").await;
    store.post_form("/cart/add", "product_id=p1").await;

    let page = store.post_form("/country/select", "country=us").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Switch to United States?"));
    assert!(page.body.contains(r#"action="/country/switch/confirm""#));
    assert_eq!(store.get("/cart/count").await.body, "1");
    assert!(store.get("/cart").await.body.contains("৳12.00"));
}

#[tokio::test]
async fn test_switch_with_items_returns_dialog() {
    let mut store = store_with_mug().await;
    store.post_form("/country/select", "country=bd").await;
    store.post_form("/cart/add", "product_id=p1").await;

    let dialog = store.post_form("/country/switch", "country=us").await;

    assert_eq!(dialog.status, StatusCode::OK);
    assert!(dialog.body.contains("<dialog"));
    assert!(dialog.body.contains(r#"name="country" value="us""#));
    assert_eq!(store.get("/cart/count").await.body, "1");
}

#[tokio::test]
async fn test_switch_to_current_country_does_nothing() {
    let mut store = store_with_mug().await;
    store.post_form("/country/select", "country=bd").await;
    store.post_form("/cart/add", "product_id=p1").await;

    let unchanged = store.post_form("/country/switch", "country=bd").await;

    assert_eq!(unchanged.status, StatusCode::OK);
    assert_eq!(unchanged.body, "");
    assert_eq!(store.get("/cart/count").await.body, "1");
}

#[tokio::test]
async fn test_confirmed_switch_clears_cart_and_changes_currency() {
    let mut store = store_with_mug().await;
    store.post_form("/country/select", "country=bd").await;
    store.post_form("/cart/add", "product_id=p1").await;
    store.post_form("/country/switch", "country=us").await;

    let confirmed = store.post_form("/country/switch/confirm", "country=us").await;

    assert_eq!(confirmed.status, StatusCode::SEE_OTHER);
    assert_eq!(confirmed.location(), Some("/"));
    assert_eq!(confirmed.header("hx-trigger"), Some("cart-updated"));
    assert_eq!(store.get("/cart/count").await.body, "");

    store.post_form("/cart/add", "product_id=p1").await;
    let cart = store.get("/cart").await;
    assert!(cart.body.contains("$12.00"));
    assert!(!cart.body.contains("৳12.00"));
}

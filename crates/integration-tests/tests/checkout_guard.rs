//! Checkout preconditions: signed in, region chosen, cart not empty.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use shopfront_integration_tests::{TestStore, single_country_preference};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_checkout_requires_login() {
    let mut store = TestStore::start(single_country_preference()).await;

    let response = store.get("/checkout").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/login"));
}

#[tokio::test]
async fn test_signed_in_with_empty_cart_goes_to_cart() {
    let mut store = TestStore::start(single_country_preference()).await;
    store.mock_login().await;

    let login = store
        .post_form("/login", "email=ada%40example.com&password=secret-pw")
        .await;
    assert_eq!(login.status, StatusCode::SEE_OTHER);
    assert_eq!(login.location(), Some("/"));

    let response = store.get("/checkout").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/cart"));
}

#[tokio::test]
async fn test_signed_in_with_items_sees_form() {
    let mut store = TestStore::start(single_country_preference()).await;
    store.mock_login().await;
    store
        .mock_product(json!({"_id": "p1", "productName": "Mug", "productPrice": 12}))
        .await;

    store
        .post_form("/login", "email=ada%40example.com&password=secret-pw")
        .await;
    store.post_form("/cart/add", "product_id=p1").await;

    let response = store.get("/checkout").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(r#"value="Ada""#));
    assert!(response.body.contains("Bangladesh"));
    assert!(response.body.contains("৳12.00"));
}

#[tokio::test]
async fn test_rejected_login_rerenders_form() {
    let mut store = TestStore::start(single_country_preference()).await;
    Mock::given(method("POST"))
        .and(path("/customer/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
        .mount(&store.backend)
        .await;

    let response = store
        .post_form("/login", "email=ada%40example.com&password=wrong-pw")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Invalid credentials"));
    assert!(response.body.contains(r#"value="ada@example.com""#));
}

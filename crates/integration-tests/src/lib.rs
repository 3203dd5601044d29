//! Integration test harness for the Shopfront storefront.
//!
//! Each test starts a `wiremock` server standing in for the commerce backend,
//! builds the real router over it with an in-memory session store, and sends
//! requests with `tower::ServiceExt::oneshot`. The session cookie is carried
//! between requests by [`TestStore`].
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopfront_core::auth::LOGIN_SUCCESS_MESSAGE;
use shopfront_storefront::config::{BackendConfig, StorefrontConfig};
use shopfront_storefront::middleware::create_session_layer;
use shopfront_storefront::state::AppState;

/// Domain every test store is served on.
pub const DOMAIN: &str = "shop.test";

/// Store id behind [`DOMAIN`].
pub const STORE_ID: &str = "store-1";

/// A response reduced to what tests look at.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    /// A response header as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// One-country store preference.
#[must_use]
pub fn single_country_preference() -> Value {
    json!({
        "storeName": "Test Shop",
        "storeEmail": "hello@shop.test",
        "countries": [
            {"_id": "bd", "country_name": "Bangladesh", "currency_code": "BDT",
             "currency_symbol": "৳", "currency_name": "Taka", "isDefault": true}
        ]
    })
}

/// Two-country store preference.
#[must_use]
pub fn two_country_preference() -> Value {
    json!({
        "storeName": "Test Shop",
        "countries": [
            {"_id": "bd", "country_name": "Bangladesh", "currency_code": "BDT",
             "currency_symbol": "৳", "currency_name": "Taka", "isDefault": true},
            {"_id": "us", "country_name": "United States", "currency_code": "USD",
             "currency_symbol": "$", "currency_name": "Dollar"}
        ]
    })
}

/// A storefront over a mocked backend, with one visitor's cookie jar.
pub struct TestStore {
    pub backend: MockServer,
    app: Router,
    cookie: Option<String>,
}

impl TestStore {
    /// Start a backend that knows [`DOMAIN`] and serves `preference`.
    pub async fn start(preference: Value) -> Self {
        let backend = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/publish/domainInfo/{DOMAIN}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"storeId": STORE_ID})))
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/store/preference/"))
            .and(query_param("storeId", STORE_ID))
            .respond_with(ResponseTemplate::new(200).set_body_json(preference))
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/store/theme/data/{STORE_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"sections": {"header": [], "body": [], "footer": []}}
            })))
            .mount(&backend)
            .await;

        let config = StorefrontConfig {
            database_url: None,
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k".repeat(32)),
            backend: BackendConfig::new(&backend.uri()).unwrap(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config).unwrap();
        let session_layer = create_session_layer(MemoryStore::default(), state.config());
        let app = shopfront_storefront::app(state, session_layer).unwrap();

        Self {
            backend,
            app,
            cookie: None,
        }
    }

    /// Serve `product` from `/product/?productId=`.
    pub async fn mock_product(&self, product: Value) {
        let id = product["_id"].as_str().unwrap_or_default().to_owned();
        Mock::given(method("GET"))
            .and(path("/product/"))
            .and(query_param("productId", id.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": product})))
            .mount(&self.backend)
            .await;
    }

    /// Accept `ada@example.com` at `/customer/auth/login` as customer `c1`.
    pub async fn mock_login(&self) {
        Mock::given(method("POST"))
            .and(path("/customer/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": LOGIN_SUCCESS_MESSAGE,
                "token": "tok-1",
                "data": {"customerId": "c1", "name": "Ada", "email": "ada@example.com"}
            })))
            .mount(&self.backend)
            .await;
    }

    /// Sign in through the login form with [`Self::mock_login`]'s customer.
    pub async fn sign_in(&mut self) {
        self.mock_login().await;
        let response = self
            .post_form("/login", "email=ada%40example.com&password=secret-pw")
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
    }

    /// Send `request` as this visitor on `host`.
    pub async fn send_to(&mut self, host: &str, request: axum::http::request::Builder, body: Body) -> TestResponse {
        let mut request = request
            .header(header::HOST, host)
            .header("x-forwarded-for", "203.0.113.7");
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.cookie = Some(set_cookie.to_owned());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// GET `uri` on [`DOMAIN`].
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send_to(DOMAIN, Request::builder().method("GET").uri(uri), Body::empty())
            .await
    }

    /// POST an urlencoded `form` to `uri` on [`DOMAIN`].
    pub async fn post_form(&mut self, uri: &str, form: &str) -> TestResponse {
        self.send_to(
            DOMAIN,
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(form.to_owned()),
        )
        .await
    }
}

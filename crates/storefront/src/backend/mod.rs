//! Commerce backend REST client.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest` with a per-request timeout
//! - The backend is the source of truth; nothing is persisted locally
//! - Store-level responses (theme, preference, meta, facets, payment config)
//!   are cached in memory via `moka`; auth, orders and product listings
//!   never are
//! - No retries. A failed call surfaces as [`BackendError`] and the caller
//!   decides whether to degrade or fail the page
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let sections = client.theme_sections(&store_id).await?;
//! ```

mod cache;
pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use shopfront_core::auth::{AuthInfo, AuthResponse, LOGIN_SUCCESS_MESSAGE};
use shopfront_core::catalog::{Brand, Category, Product, ProductPage};
use shopfront_core::checkout::{BankDetails, OrderRequest, PaymentMethod};
use shopfront_core::content::{BlogDetail, BlogList, BlogPost, StoreMeta};
use shopfront_core::country::StorePreference;
use shopfront_core::order::{CustomerOrder, CustomerOrders};
use shopfront_core::section::{PageSections, ThemeData};
use shopfront_core::store::{ResolveError, StoreDirectory};
use shopfront_core::{BlogId, ProductId, StoreId};

use crate::config::BackendConfig;
use cache::{CacheKey, CacheValue};
pub use types::{CountryReference, StripeStatus};
use types::{DataEnvelope, DomainInfo, ErrorBody, ListEnvelope, LoginRequest, SignupRequest};

/// Shown when a login fails without a usable backend message.
pub const LOGIN_FALLBACK_ERROR: &str = "Invalid email or password. Please try again.";

/// Shown when a signup fails without a usable backend message.
pub const SIGNUP_FALLBACK_ERROR: &str = "Failed to sign up. Please try again.";

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure or timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status.
    #[error("backend returned {status} for {path}")]
    Status { status: StatusCode, path: String },

    /// Body did not match the expected shape.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The requested entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request with a message meant for the user.
    #[error("{0}")]
    Rejected(String),

    /// The store's theme response carried no sections.
    #[error("theme for store {0} has no sections")]
    MissingSections(String),
}

impl BackendError {
    /// User-facing message for rejections, if this is one.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Paged product listing request.
#[derive(Debug, Clone, Copy)]
pub struct ProductQuery<'a> {
    pub store_id: &'a StoreId,
    pub country_name: Option<&'a str>,
    pub page: u32,
    pub limit: u32,
    pub search: Option<&'a str>,
}

/// Client for the commerce backend.
///
/// Cheap to clone. Store-level responses are cached for the configured TTL.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("shopfront-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_owned(),
                cache,
            }),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url))
    }

    /// Send a request and return its status and body text.
    async fn send(&self, path: &str, request: RequestBuilder) -> Result<(StatusCode, String), BackendError> {
        let response = request.send().await.map_err(|e| {
            warn!(path, error = %e, "backend request failed");
            e
        })?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(
                path,
                status = %status,
                body = %body.chars().take(300).collect::<String>(),
                "backend returned non-success status"
            );
        }
        Ok((status, body))
    }

    /// Send, require 2xx, and decode the body.
    async fn fetch<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T, BackendError> {
        let (status, body) = self.send(path, request).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_owned()));
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                status,
                path: path.to_owned(),
            });
        }
        decode(path, &body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, BackendError> {
        self.fetch(path, self.request(Method::GET, path).query(query)).await
    }

    // =========================================================================
    // Store
    // =========================================================================

    /// Look up the store connected to `domain`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no store uses the domain.
    #[instrument(skip(self))]
    pub async fn domain_info(&self, domain: &str) -> Result<StoreId, BackendError> {
        let path = format!("/publish/domainInfo/{}", urlencoding::encode(domain));
        let info: DomainInfo = self.get_json(&path, &[]).await?;
        info.store_id
            .filter(|id| !id.as_str().is_empty())
            .ok_or(BackendError::NotFound(path))
    }

    /// The store's page layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails, or
    /// [`BackendError::MissingSections`] when the theme has no `sections`.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn theme_sections(&self, store_id: &StoreId) -> Result<Arc<PageSections>, BackendError> {
        let key = CacheKey::Theme(store_id.clone());
        if let Some(CacheValue::Theme(sections)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for theme");
            return Ok(sections);
        }

        let path = format!("/store/theme/data/{store_id}");
        let theme: ThemeData = self.get_json(&path, &[]).await?;
        let sections = Arc::new(
            theme
                .into_sections()
                .ok_or_else(|| BackendError::MissingSections(store_id.to_string()))?,
        );

        self.inner
            .cache
            .insert(key, CacheValue::Theme(Arc::clone(&sections)))
            .await;
        Ok(sections)
    }

    /// Store preference: contact details, countries, currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn store_preference(&self, store_id: &StoreId) -> Result<Arc<StorePreference>, BackendError> {
        let key = CacheKey::Preference(store_id.clone());
        if let Some(CacheValue::Preference(preference)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for store preference");
            return Ok(preference);
        }

        let preference: Arc<StorePreference> = Arc::new(
            self.get_json("/store/preference/", &[("storeId", store_id.as_str())])
                .await?,
        );

        self.inner
            .cache
            .insert(key, CacheValue::Preference(Arc::clone(&preference)))
            .await;
        Ok(preference)
    }

    /// Page title and description. Failures fall back to defaults.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn store_meta(&self, store_id: &StoreId) -> Arc<StoreMeta> {
        let key = CacheKey::Meta(store_id.clone());
        if let Some(CacheValue::Meta(meta)) = self.inner.cache.get(&key).await {
            return meta;
        }

        match self
            .get_json::<serde_json::Value>("/meta/store/", &[("storeId", store_id.as_str())])
            .await
        {
            Ok(value) => {
                let meta = Arc::new(StoreMeta::from_response(value));
                self.inner
                    .cache
                    .insert(key, CacheValue::Meta(Arc::clone(&meta)))
                    .await;
                meta
            }
            Err(e) => {
                warn!(error = %e, "failed to load store meta, using defaults");
                Arc::new(StoreMeta::default())
            }
        }
    }

    /// Bank transfer details, if the store has an account configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn bank_details(&self, store_id: &StoreId) -> Result<Option<Arc<BankDetails>>, BackendError> {
        let key = CacheKey::Bank(store_id.clone());
        if let Some(CacheValue::Bank(details)) = self.inner.cache.get(&key).await {
            return Ok(details);
        }

        let path = format!("/bankpayment/public/{store_id}");
        let details = match self.get_json::<DataEnvelope<BankDetails>>(&path, &[]).await {
            Ok(envelope) => envelope.data.map(Arc::new),
            Err(BackendError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        self.inner
            .cache
            .insert(key, CacheValue::Bank(details.clone()))
            .await;
        Ok(details)
    }

    /// Whether the store has a working Stripe connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn stripe_status(&self, store_id: &StoreId) -> Result<StripeStatus, BackendError> {
        let key = CacheKey::Stripe(store_id.clone());
        if let Some(CacheValue::Stripe(status)) = self.inner.cache.get(&key).await {
            return Ok(status);
        }

        let path = format!("/payments/stripe/public/client/{store_id}");
        let status = self
            .get_json::<DataEnvelope<StripeStatus>>(&path, &[])
            .await?
            .data
            .unwrap_or_default();

        self.inner.cache.insert(key, CacheValue::Stripe(status)).await;
        Ok(status)
    }

    /// Drop every cached response for `store_id`.
    pub async fn invalidate_store(&self, store_id: &StoreId) {
        for key in [
            CacheKey::Theme(store_id.clone()),
            CacheKey::Preference(store_id.clone()),
            CacheKey::Meta(store_id.clone()),
            CacheKey::Categories(store_id.clone()),
            CacheKey::Brands(store_id.clone()),
            CacheKey::Bank(store_id.clone()),
            CacheKey::Stripe(store_id.clone()),
        ] {
            self.inner.cache.invalidate(&key).await;
        }
    }

    // =========================================================================
    // Countries
    // =========================================================================

    /// Global country reference list used by the checkout form.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self))]
    pub async fn countries(&self) -> Result<Arc<Vec<CountryReference>>, BackendError> {
        if let Some(CacheValue::Countries(list)) = self.inner.cache.get(&CacheKey::Countries).await {
            return Ok(list);
        }

        let list: Arc<Vec<CountryReference>> = Arc::new(self.get_json("/api/countries", &[]).await?);
        self.inner
            .cache
            .insert(CacheKey::Countries, CacheValue::Countries(Arc::clone(&list)))
            .await;
        Ok(list)
    }

    /// One entry of the country reference list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self))]
    pub async fn country(&self, code: &str) -> Result<CountryReference, BackendError> {
        let path = format!("/api/countries/{}", urlencoding::encode(code));
        self.get_json(&path, &[]).await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// A page of the store's products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self), fields(store_id = %query.store_id))]
    pub async fn products(&self, query: ProductQuery<'_>) -> Result<ProductPage, BackendError> {
        let page = query.page.to_string();
        let limit = query.limit.to_string();
        let mut params = vec![
            ("storeId", query.store_id.as_str()),
            ("page", page.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(country) = query.country_name {
            params.push(("countryName", country));
        }
        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            params.push(("search", search));
        }
        self.get_json("/product/store", &params).await
    }

    /// Specific products by id, in the backend's order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn product_batch(
        &self,
        ids: &[ProductId],
        limit: u32,
        country_name: Option<&str>,
    ) -> Result<Vec<Product>, BackendError> {
        let joined = ids.iter().map(ProductId::as_str).collect::<Vec<_>>().join(",");
        let limit = limit.to_string();
        let mut params = vec![("ids", joined.as_str()), ("limit", limit.as_str())];
        if let Some(country) = country_name {
            params.push(("countryName", country));
        }
        let page: ProductPage = self.get_json("/product/store/batches", &params).await?;
        Ok(page.data)
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn product(&self, product_id: &ProductId) -> Result<Product, BackendError> {
        let envelope: DataEnvelope<Product> = self
            .get_json("/product/", &[("productId", product_id.as_str())])
            .await?;
        envelope
            .data
            .ok_or_else(|| BackendError::NotFound(format!("product {product_id}")))
    }

    /// Category facets for the shop page.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn categories(&self, store_id: &StoreId) -> Result<Arc<Vec<Category>>, BackendError> {
        let key = CacheKey::Categories(store_id.clone());
        if let Some(CacheValue::Categories(list)) = self.inner.cache.get(&key).await {
            return Ok(list);
        }

        let envelope: ListEnvelope<Category> =
            self.get_json("/category", &[("storeId", store_id.as_str())]).await?;
        let list = Arc::new(envelope.data);
        self.inner
            .cache
            .insert(key, CacheValue::Categories(Arc::clone(&list)))
            .await;
        Ok(list)
    }

    /// Brand facets for the shop page.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn brands(&self, store_id: &StoreId) -> Result<Arc<Vec<Brand>>, BackendError> {
        let key = CacheKey::Brands(store_id.clone());
        if let Some(CacheValue::Brands(list)) = self.inner.cache.get(&key).await {
            return Ok(list);
        }

        let envelope: ListEnvelope<Brand> =
            self.get_json("/brand", &[("storeId", store_id.as_str())]).await?;
        let list = Arc::new(envelope.data);
        self.inner
            .cache
            .insert(key, CacheValue::Brands(Arc::clone(&list)))
            .await;
        Ok(list)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Sign a customer in.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` with a user-facing message when the
    /// credentials are refused, or a transport error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, store_id: &StoreId, email: &str, password: &str) -> Result<AuthInfo, BackendError> {
        let path = "/customer/auth/login";
        let request = self
            .request(Method::POST, path)
            .header("storeid", store_id.as_str())
            .json(&LoginRequest { email, password });

        let (status, body) = self.send(path, request).await?;
        if !status.is_success() {
            return Err(BackendError::Rejected(rejection_message(&body, "Login failed")));
        }

        let response: AuthResponse = decode(path, &body)?;
        if response.message.as_deref() != Some(LOGIN_SUCCESS_MESSAGE) {
            return Err(BackendError::Rejected(LOGIN_FALLBACK_ERROR.to_owned()));
        }
        response
            .into_auth_info()
            .ok_or_else(|| BackendError::Rejected(LOGIN_FALLBACK_ERROR.to_owned()))
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` with a user-facing message when the
    /// backend refuses the signup, or a transport error.
    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        store_id: &StoreId,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthInfo, BackendError> {
        let path = "/customer/auth/onboard";
        let request = self
            .request(Method::POST, path)
            .header("storeid", store_id.as_str())
            .json(&SignupRequest { name, email, password });

        let (status, body) = self.send(path, request).await?;
        if !status.is_success() {
            return Err(BackendError::Rejected(rejection_message(&body, "Sign up failed")));
        }

        let response: AuthResponse = decode(path, &body)?;
        response
            .into_auth_info()
            .ok_or_else(|| BackendError::Rejected(SIGNUP_FALLBACK_ERROR.to_owned()))
    }

    /// Orders placed by the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self, auth), fields(customer_id = %auth.data.customer_id))]
    pub async fn customer_orders(&self, auth: &AuthInfo) -> Result<Vec<CustomerOrder>, BackendError> {
        let customer_id = auth.data.customer_id.as_str();
        let path = format!("/orders/customerorders/{}", urlencoding::encode(customer_id));
        let request = self
            .request(Method::GET, &path)
            .header("Authorization", auth.bearer())
            .header("customerid", customer_id);
        let orders: CustomerOrders = self.fetch(&path, request).await?;
        Ok(orders.data)
    }

    /// Submit an order for `method`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not accept the order.
    #[instrument(skip(self, auth, order), fields(method = method.as_str()))]
    pub async fn place_order(
        &self,
        store_id: &StoreId,
        auth: &AuthInfo,
        method: PaymentMethod,
        order: &OrderRequest,
    ) -> Result<serde_json::Value, BackendError> {
        self.post_authorized(method.endpoint(), store_id, auth, order).await
    }

    async fn post_authorized<B: Serialize + ?Sized>(
        &self,
        path: &str,
        store_id: &StoreId,
        auth: &AuthInfo,
        body: &B,
    ) -> Result<serde_json::Value, BackendError> {
        let request = self
            .request(Method::POST, path)
            .header("Authorization", auth.bearer())
            .header("customerid", auth.data.customer_id.as_str())
            .header("storeid", store_id.as_str())
            .json(body);
        let (status, text) = self.send(path, request).await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status,
                path: path.to_owned(),
            });
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::Null))
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// All blog posts of a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn blogs(&self, store_id: &StoreId) -> Result<Vec<BlogPost>, BackendError> {
        let list: BlogList = self
            .get_json("/blog/all/", &[("storeId", store_id.as_str())])
            .await?;
        Ok(list.data)
    }

    /// One blog post.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the post does not exist.
    #[instrument(skip(self))]
    pub async fn blog(&self, blog_id: &BlogId) -> Result<BlogPost, BackendError> {
        let detail: BlogDetail = self
            .get_json("/blog/", &[("blogId", blog_id.as_str())])
            .await?;
        detail
            .data
            .ok_or_else(|| BackendError::NotFound(format!("blog {blog_id}")))
    }
}

impl StoreDirectory for BackendClient {
    async fn lookup_store(&self, domain: &str) -> Result<StoreId, ResolveError> {
        match self.domain_info(domain).await {
            Ok(id) => Ok(id),
            Err(BackendError::NotFound(_)) => Err(ResolveError::UnknownDomain {
                domain: domain.to_owned(),
            }),
            Err(e) => Err(ResolveError::Lookup(e.to_string())),
        }
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|source| {
        warn!(
            path,
            error = %source,
            body = %body.chars().take(300).collect::<String>(),
            "failed to decode backend response"
        );
        BackendError::Decode {
            path: path.to_owned(),
            source,
        }
    })
}

fn rejection_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&BackendConfig::new(&server.uri()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_domain_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/publish/domainInfo/shop.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"storeId": "s1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/publish/domainInfo/nope.test"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server).await;
        assert_eq!(client.lookup_store("shop.test").await.unwrap(), StoreId::new("s1"));
        assert_eq!(
            client.lookup_store("nope.test").await,
            Err(ResolveError::UnknownDomain {
                domain: "nope.test".into()
            })
        );
    }

    #[tokio::test]
    async fn test_lookup_server_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).await.lookup_store("shop.test").await.unwrap_err();
        assert!(matches!(err, ResolveError::Lookup(_)));
    }

    #[tokio::test]
    async fn test_store_preference_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/preference/"))
            .and(query_param("storeId", "s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "storeName": "Acme",
                "countries": [{"_id": "c1", "country_name": "France", "currency_code": "EUR", "currency_symbol": "€", "isDefault": true}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        let first = client.store_preference(&StoreId::new("s1")).await.unwrap();
        let second = client.store_preference(&StoreId::new("s1")).await.unwrap();
        assert_eq!(first.countries().len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_theme_without_sections_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/theme/data/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/store/theme/data/s2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"sections": {"body": []}}})))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let err = client.theme_sections(&StoreId::new("s1")).await.unwrap_err();
        assert!(matches!(err, BackendError::MissingSections(_)));

        // Missing header or footer lists are just empty.
        let sections = client.theme_sections(&StoreId::new("s2")).await.unwrap();
        assert!(sections.header.is_empty());
    }

    #[tokio::test]
    async fn test_login_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/customer/auth/login"))
            .and(header("storeid", "s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Authentication Successfully",
                "token": "tok",
                "data": {"customerId": "c1", "name": "Ada", "email": "ada@example.com"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/customer/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Wrong password"})))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let store = StoreId::new("s1");
        let auth = client.login(&store, "ada@example.com", "pw").await.unwrap();
        assert_eq!(auth.token, "tok");

        let err = client.login(&store, "ada@example.com", "bad").await.unwrap_err();
        assert_eq!(err.user_message(), Some("Wrong password"));
    }

    #[tokio::test]
    async fn test_login_without_success_message_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "nope"})))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .login(&StoreId::new("s1"), "a@b.co", "pw")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), Some(LOGIN_FALLBACK_ERROR));
    }

    #[tokio::test]
    async fn test_product_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .mount(&server)
            .await;

        let err = client(&server).await.product(&ProductId::new("p9")).await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_product_listing_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/store"))
            .and(query_param("storeId", "s1"))
            .and(query_param("countryName", "France"))
            .and(query_param("limit", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"_id": "p1", "productName": "Mug", "productPrice": 10}],
                "totalPages": 3
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .await
            .products(ProductQuery {
                store_id: &StoreId::new("s1"),
                country_name: Some("France"),
                page: 1,
                limit: 20,
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.total_pages, Some(3));
    }

    #[tokio::test]
    async fn test_country_by_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/countries/FR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "country_name": "France", "iso2": "FR", "currency_code": "EUR"
            })))
            .mount(&server)
            .await;

        let country = client(&server).await.country("FR").await.unwrap();
        assert_eq!(country.name, "France");
        assert_eq!(country.currency_code.as_deref(), Some("EUR"));
    }
}

//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (theme body sections)
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (backend reachable)
//!
//! # Catalog
//! GET  /shop                      - Product listing with filters
//! GET  /shop/{id}                 - Product detail
//! GET  /search                    - Search results fragment (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart (toast, triggers cart-updated)
//! POST /cart/update               - Update quantity (cart body fragment)
//! POST /cart/remove               - Remove line (cart body fragment)
//! POST /cart/clear                - Empty the cart
//! GET  /cart/count                - Cart count badge
//!
//! # Checkout
//! GET  /checkout                  - Shipping and payment form
//! POST /checkout                  - Place order
//!
//! # Country
//! GET  /country/select            - Region picker page
//! POST /country/select            - First selection
//! POST /country/switch            - Request a switch (may ask to confirm)
//! POST /country/switch/confirm    - Confirm a switch, clears the cart
//!
//! # Customer
//! GET  /login, POST /login        - Sign in
//! GET  /signup, POST /signup      - Create account
//! POST /logout                    - Sign out
//! GET  /orders                    - Order history
//!
//! # Content
//! GET  /blog                      - Blog index
//! GET  /blog/{id}                 - Blog post
//! GET  /contact, POST /contact    - Contact page
//!
//! # Store
//! POST /store/refresh             - Forget the cached store and resolve again
//!
//! # Section data (HTMX)
//! GET  /fragments/product-grid    - Product grid
//! GET  /fragments/country-switcher - Footer country switcher
//! GET  /fragments/store-contact   - Footer store details
//! GET  /fragments/account-menu    - Nav account menu
//! ```

pub mod auth;
pub mod blog;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod country;
pub mod home;
pub mod layout;
pub mod orders;
pub mod products;
pub mod search;
pub mod store;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{RateLimitConfigError, auth_rate_limiter, form_rate_limiter};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the country routes router.
pub fn country_routes() -> Router<AppState> {
    Router::new()
        .route("/select", get(country::select_page).post(country::select))
        .route("/switch", post(country::switch))
        .route("/switch/confirm", post(country::confirm_switch))
}

/// Create the section data fragment router.
pub fn fragment_routes() -> Router<AppState> {
    Router::new()
        .route("/product-grid", get(products::grid_fragment))
        .route("/country-switcher", get(country::switcher_fragment))
        .route("/store-contact", get(store::contact_fragment))
        .route("/account-menu", get(auth::account_menu))
}

/// Create the auth routes router. Submissions are rate limited per client.
///
/// # Errors
///
/// Returns an error if the rate limiter cannot be configured.
pub fn auth_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .layer(auth_rate_limiter()?);

    Ok(Router::new()
        .route("/login", get(auth::login_page))
        .route("/signup", get(auth::signup_page))
        .route("/logout", post(auth::logout))
        .merge(limited))
}

/// Create the order and contact form routes. Submissions are rate limited.
///
/// # Errors
///
/// Returns an error if the rate limiter cannot be configured.
pub fn form_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    let limited = Router::new()
        .route("/checkout", post(checkout::submit))
        .route("/contact", post(contact::submit))
        .layer(form_rate_limiter()?);

    Ok(Router::new()
        .route("/checkout", get(checkout::show))
        .route("/contact", get(contact::show))
        .merge(limited))
}

/// Create all routes for the storefront.
///
/// # Errors
///
/// Returns an error if a rate limiter cannot be configured.
pub fn routes() -> Result<Router<AppState>, RateLimitConfigError> {
    Ok(Router::new()
        // Home page
        .route("/", get(home::home))
        // Health
        .route("/health", get(store::health))
        .route("/health/ready", get(store::readiness))
        // Catalog
        .route("/shop", get(products::index))
        .route("/shop/{id}", get(products::show))
        .route("/search", get(search::search))
        // Cart
        .nest("/cart", cart_routes())
        // Country
        .nest("/country", country_routes())
        // Orders
        .route("/orders", get(orders::index))
        // Content
        .route("/blog", get(blog::index))
        .route("/blog/{id}", get(blog::show))
        // Store
        .route("/store/refresh", post(store::refresh))
        // Section data
        .nest("/fragments", fragment_routes())
        // Auth, checkout, contact
        .merge(auth_routes()?)
        .merge(form_routes()?))
}

//! Cart route handlers.
//!
//! The cart lives in the visitor's client storage. Mutations are HTMX posts
//! that answer with a fragment and an `HX-Trigger: cart-updated` header so
//! the nav badge refreshes itself. Prices are taken from the backend's
//! product document at add time, never from the form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::cart::{Cart, CartItem, CartNotice};
use shopfront_core::catalog::Product;
use shopfront_core::types::Currency;
use shopfront_core::{ProductId, VariantId};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{CspNonce, StoreScope};
use crate::models::Flash;
use crate::routes::layout::{Layout, Shop};
use crate::sections::asset_path;
use crate::session_storage::SessionStorage;
use crate::state::AppState;

/// Header telling HTMX listeners the cart changed.
pub const CART_UPDATED: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Message shown when a required variant option is missing.
pub const SELECT_OPTIONS_MESSAGE: &str = "Please select all required options";

/// Message shown when a multi-country store has no country chosen yet.
pub const SELECT_REGION_MESSAGE: &str = "Please choose your region first";

// =============================================================================
// Views
// =============================================================================

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub variant: Option<String>,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub subtotal: String,
    pub savings: Option<String>,
}

impl CartView {
    /// Build the view for `items`, formatting in `currency`.
    #[must_use]
    pub fn new(items: &[CartItem], currency: &Currency, asset_url: &str) -> Self {
        let savings = shopfront_core::cart::total_savings(items);
        Self {
            items: items
                .iter()
                .map(|item| CartItemView {
                    id: item.id.clone(),
                    product_id: item.product_id.to_string(),
                    name: item.product_name.clone(),
                    variant: item.variant_label().map(str::to_owned),
                    image: item
                        .thumbnail_image
                        .as_deref()
                        .map(|path| asset_path(asset_url, path)),
                    quantity: item.quantity,
                    price: currency.format(item.price()),
                    compare_at_price: item.compare_at_price.map(|p| currency.format(p)),
                    line_total: currency.format(item.line_total()),
                })
                .collect(),
            item_count: shopfront_core::cart::total_items(items),
            subtotal: currency.format(shopfront_core::cart::subtotal(items)),
            savings: (!savings.is_zero()).then(|| currency.format(savings)),
        }
    }

    /// True when there is nothing in the cart.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    /// Chosen option id, empty when none.
    #[serde(default)]
    pub variant_id: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/cart.html")]
pub struct CartPageTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart body fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/cart_body.html")]
pub struct CartBodyTemplate {
    pub cart: CartView,
}

/// Toast notice fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/toast.html")]
pub struct ToastTemplate {
    pub css_class: &'static str,
    pub message: String,
}

impl From<Flash> for ToastTemplate {
    fn from(flash: Flash) -> Self {
        Self {
            css_class: flash.css_class(),
            message: flash.message,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn show(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    let cart = CartView::new(
        Cart::load(&mut scope.storage).items(),
        &shop.currency(),
        &state.config().backend.asset_url,
    );
    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Cart")).await?;
    scope.save().await?;

    Ok(CartPageTemplate { layout, cart }.into_response())
}

/// Pick the variant a form asked for, if the product has it.
fn chosen_variant<'p>(
    product: &'p Product,
    variant_id: Option<&str>,
) -> Option<(&'p str, &'p shopfront_core::catalog::VariantOption)> {
    let id = VariantId::new(variant_id.filter(|v| !v.is_empty())?);
    product
        .variant_config()
        .and_then(|config| config.find_option(&id))
        .map(|(attribute, option)| (attribute.name.as_str(), option))
}

/// Add a product to the cart (HTMX).
///
/// Answers with a toast fragment for `#toasts`.
#[instrument(skip_all, fields(store_id = %scope.store_id, product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    mut scope: StoreScope,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    if shop.needs_selection() {
        scope.save().await?;
        return Ok(ToastTemplate::from(Flash::error(SELECT_REGION_MESSAGE)).into_response());
    }

    let product = state.backend().product(&ProductId::new(form.product_id.as_str())).await?;
    let variant = chosen_variant(&product, form.variant_id.as_deref());
    if variant.is_none() && product.has_required_variants() {
        scope.save().await?;
        return Ok(ToastTemplate::from(Flash::error(SELECT_OPTIONS_MESSAGE)).into_response());
    }

    let notice = {
        let mut cart = Cart::load(&mut scope.storage);
        cart.add_to_cart(
            &product,
            form.quantity.unwrap_or(1),
            variant.map(|(_, option)| option),
            variant.map(|(attribute, _)| attribute),
        )
        .map_err(|e| crate::error::AppError::BadRequest(e.to_string()))?
    };
    scope.save().await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", form.product_id.as_str())]));

    let toast = match notice {
        CartNotice::AlreadyInCart => Flash::error(notice.message()),
        _ => Flash::success(notice.message()),
    };
    Ok((AppendHeaders([CART_UPDATED]), ToastTemplate::from(toast)).into_response())
}

/// Apply `mutate` to the cart and answer with the refreshed cart body.
async fn mutate_cart(
    state: &AppState,
    mut scope: StoreScope,
    mutate: impl FnOnce(&mut Cart<'_, SessionStorage>),
) -> Result<Response> {
    let shop = Shop::load(state, &mut scope).await;
    let cart = {
        let mut cart = Cart::load(&mut scope.storage);
        mutate(&mut cart);
        CartView::new(cart.items(), &shop.currency(), &state.config().backend.asset_url)
    };
    scope.save().await?;

    Ok((AppendHeaders([CART_UPDATED]), CartBodyTemplate { cart }).into_response())
}

/// Set a line's quantity (HTMX). Zero or less removes the line.
#[instrument(skip_all, fields(store_id = %scope.store_id, line = %form.id))]
pub async fn update(
    State(state): State<AppState>,
    scope: StoreScope,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    mutate_cart(&state, scope, |cart| {
        cart.update_quantity(&form.id, form.quantity);
    })
    .await
}

/// Remove a line (HTMX).
#[instrument(skip_all, fields(store_id = %scope.store_id, line = %form.id))]
pub async fn remove(
    State(state): State<AppState>,
    scope: StoreScope,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    mutate_cart(&state, scope, |cart| {
        cart.remove_from_cart(&form.id);
    })
    .await
}

/// Empty the cart and go back to the cart page.
#[instrument(skip_all)]
pub async fn clear(mut storage: SessionStorage) -> Result<Response> {
    let notice = Cart::load(&mut storage).clear_cart();
    let session = storage.session().clone();
    storage.save().await?;
    Flash::success(notice.message()).push(&session).await;

    Ok(Redirect::to("/cart").into_response())
}

/// Cart count badge (HTMX). Empty when the cart is empty.
#[instrument(skip_all)]
pub async fn count(mut storage: SessionStorage) -> Result<Response> {
    let total = Cart::load(&mut storage).total_items();
    // Loading discards a corrupt cart; persist that.
    storage.save().await?;

    let body = if total == 0 {
        String::new()
    } else {
        total.to_string()
    };
    Ok(Html(body).into_response())
}

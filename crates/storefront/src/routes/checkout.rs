//! Checkout route handlers.
//!
//! Checkout needs a signed-in customer (orders are posted with their bearer
//! token), a chosen country and a non-empty cart. Submission validates the
//! shipping form, then posts the order for the chosen payment method. Only
//! one submission per customer may be in flight; a second one is refused
//! until the first has an answer.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use shopfront_core::auth::AuthInfo;
use shopfront_core::cart::{self, Cart, CartItem};
use shopfront_core::checkout::{
    AvailableMethods, BankDetails, CheckoutError, CheckoutFlow, PaymentMethod, ShippingDetails, build_order,
};
use shopfront_core::form::FieldErrors;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{CspNonce, StoreScope};
use crate::models::Flash;
use crate::routes::cart::CartView;
use crate::routes::layout::{Layout, Shop};
use crate::state::AppState;

/// Shown when a second submission arrives while one is in flight.
pub const ALREADY_SUBMITTING_MESSAGE: &str = "Your order is already being placed. Please wait.";

/// Shown when the submitted cart was already ordered.
pub const ALREADY_PLACED_MESSAGE: &str = "This order has already been placed.";

const SIGN_IN_NOTICE: &str = "Please sign in to check out.";

/// Checkout form data: the shipping fields plus the payment method.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(flatten)]
    pub shipping: ShippingDetails,
    #[serde(default, rename = "paymentMethod")]
    pub payment_method: PaymentMethod,
}

/// A payment method offered on the page.
#[derive(Debug, Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/checkout.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub form: ShippingDetails,
    pub errors: FieldErrors,
    pub error: Option<String>,
    pub payment_options: Vec<PaymentOption>,
    pub bank: Option<BankDetails>,
}

/// Payment methods the store can take right now.
#[derive(Debug, Clone, Default)]
struct PaymentSetup {
    bank: Option<BankDetails>,
    online: bool,
}

impl PaymentSetup {
    async fn load(state: &AppState, scope: &StoreScope) -> Self {
        let backend = state.backend();
        let (bank, stripe) = tokio::join!(
            backend.bank_details(&scope.store_id),
            backend.stripe_status(&scope.store_id)
        );

        let bank = bank
            .unwrap_or_else(|e| {
                warn!(error = %e, "bank details unavailable");
                None
            })
            .filter(|details| details.is_active)
            .map(|details| (*details).clone());
        let online = stripe
            .map_err(|e| warn!(error = %e, "stripe status unavailable"))
            .is_ok_and(|status| status.is_connected());

        Self { bank, online }
    }

    const fn available(&self) -> AvailableMethods {
        AvailableMethods {
            bank_transfer: self.bank.is_some(),
            online: self.online,
        }
    }

    fn options(&self, selected: PaymentMethod) -> Vec<PaymentOption> {
        let mut methods = vec![(PaymentMethod::CashOnDelivery, "Cash on delivery")];
        if self.bank.is_some() {
            methods.push((PaymentMethod::BankTransfer, "Bank transfer"));
        }
        if self.online {
            methods.push((PaymentMethod::Online, "Pay online"));
        }
        let selected = if methods.iter().any(|(m, _)| *m == selected) {
            selected
        } else {
            PaymentMethod::CashOnDelivery
        };
        methods
            .into_iter()
            .map(|(method, label)| PaymentOption {
                value: method.as_str(),
                label,
                checked: method == selected,
            })
            .collect()
    }
}

/// Where to send a visitor who cannot check out yet.
fn guard(auth: Option<&AuthInfo>, shop: &Shop, items: &[CartItem]) -> Option<(&'static str, Option<&'static str>)> {
    if auth.is_none() {
        Some(("/login", Some(SIGN_IN_NOTICE)))
    } else if shop.needs_selection() {
        Some(("/country/select", Some("Please choose your region first.")))
    } else if items.is_empty() {
        Some(("/cart", None))
    } else {
        None
    }
}

/// Payment gateway address in an online-order answer, if any.
fn gateway_url(answer: &Value) -> Option<&str> {
    ["url", "checkoutUrl", "sessionUrl"]
        .iter()
        .find_map(|key| {
            answer
                .get(key)
                .or_else(|| answer.get("data").and_then(|d| d.get(key)))
                .and_then(Value::as_str)
        })
        .filter(|url| url.starts_with("https://"))
}

struct Page {
    form: ShippingDetails,
    method: PaymentMethod,
    errors: FieldErrors,
    error: Option<String>,
}

async fn render(state: &AppState, nonce: CspNonce, mut scope: StoreScope, shop: &Shop, page: Page) -> Result<Response> {
    let payments = PaymentSetup::load(state, &scope).await;
    let cart = CartView::new(
        Cart::load(&mut scope.storage).items(),
        &shop.currency(),
        &state.config().backend.asset_url,
    );
    let layout = Layout::load(state, &scope, shop, nonce, Some("Checkout")).await?;
    scope.save().await?;

    Ok(CheckoutTemplate {
        layout,
        cart,
        form: page.form,
        errors: page.errors,
        error: page.error,
        payment_options: payments.options(page.method),
        bank: payments.bank,
    }
    .into_response())
}

async fn redirect_away(scope: StoreScope, to: &'static str, notice: Option<&'static str>) -> Result<Response> {
    let session = scope.storage.session().clone();
    scope.save().await?;
    if let Some(notice) = notice {
        Flash::error(notice).push(&session).await;
    }
    Ok(Redirect::to(to).into_response())
}

/// Display the checkout form.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn show(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    let auth = AuthInfo::load(&mut scope.storage);
    let items = Cart::load(&mut scope.storage).items().to_vec();

    if let Some((to, notice)) = guard(auth.as_ref(), &shop, &items) {
        return redirect_away(scope, to, notice).await;
    }

    let form = ShippingDetails {
        name: auth.as_ref().map(|a| a.data.name.clone()).unwrap_or_default(),
        email: auth.as_ref().map(|a| a.data.email.clone()).unwrap_or_default(),
        country: shop.country_name().unwrap_or_default().to_owned(),
        ..ShippingDetails::default()
    };

    render(
        &state,
        nonce,
        scope,
        &shop,
        Page {
            form,
            method: PaymentMethod::default(),
            errors: FieldErrors::new(),
            error: None,
        },
    )
    .await
}

/// Place the order.
#[instrument(skip_all, fields(store_id = %scope.store_id, method = form.payment_method.as_str()))]
pub async fn submit(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let Some(auth) = AuthInfo::load(&mut scope.storage) else {
        return redirect_away(scope, "/login", Some(SIGN_IN_NOTICE)).await;
    };
    // Claimed before any backend call.
    let permit = state.begin_checkout(auth.data.customer_id.as_str());

    let shop = Shop::load(&state, &mut scope).await;
    let items = Cart::load(&mut scope.storage).items().to_vec();
    if let Some((to, notice)) = guard(Some(&auth), &shop, &items) {
        return redirect_away(scope, to, notice).await;
    }

    let method = form.payment_method;
    let shipping = form.shipping;

    let Some(permit) = permit else {
        return render(
            &state,
            nonce,
            scope,
            &shop,
            Page {
                form: shipping,
                method,
                errors: FieldErrors::new(),
                error: Some(ALREADY_SUBMITTING_MESSAGE.to_owned()),
            },
        )
        .await;
    };

    let fingerprint = cart::fingerprint(&items);
    if permit.already_placed(&fingerprint).await {
        info!(customer_id = %auth.data.customer_id, "ignoring resubmission of a placed cart");
        Cart::load(&mut scope.storage).clear_cart();
        return redirect_away(scope, "/shop", Some(ALREADY_PLACED_MESSAGE)).await;
    }

    let payments = PaymentSetup::load(&state, &scope).await;
    let mut flow = CheckoutFlow::new();
    if let Err(e) = flow.submit(&shipping, method, &items, payments.available()) {
        let (errors, error) = match e {
            CheckoutError::Invalid(errors) => (errors, None),
            CheckoutError::EmptyCart => return redirect_away(scope, "/cart", None).await,
            CheckoutError::AlreadySubmitting => (FieldErrors::new(), Some(ALREADY_SUBMITTING_MESSAGE.to_owned())),
            other @ (CheckoutError::BankTransferUnavailable | CheckoutError::OnlineUnavailable) => {
                (FieldErrors::new(), Some(capitalize(&other.to_string())))
            }
        };
        return render(&state, nonce, scope, &shop, Page { form: shipping, method, errors, error }).await;
    }

    let currency = shop.currency();
    let order = build_order(method, &items, shop.country.as_ref(), &currency.code, shipping.clone());
    let answer = state
        .backend()
        .place_order(&scope.store_id, &auth, method, &order)
        .await;

    match answer {
        Ok(answer) => {
            let message = flow.complete(true);
            permit.record_placed(fingerprint).await;
            Cart::load(&mut scope.storage).clear_cart();
            info!(customer_id = %auth.data.customer_id, items = items.len(), "order placed");
            add_breadcrumb("checkout", "Order placed", Some(&[("method", method.as_str())]));

            let to = match method {
                PaymentMethod::Online => gateway_url(&answer).unwrap_or("/shop").to_owned(),
                _ => "/shop".to_owned(),
            };
            let session = scope.storage.session().clone();
            scope.save().await?;
            Flash::success(message).push(&session).await;
            Ok(Redirect::to(&to).into_response())
        }
        Err(e) => {
            let message = flow.complete(false);
            warn!(error = %e, "order submission failed");
            let error = e.user_message().unwrap_or(message).to_owned();
            render(
                &state,
                nonce,
                scope,
                &shop,
                Page {
                    form: shipping,
                    method,
                    errors: FieldErrors::new(),
                    error: Some(error),
                },
            )
            .await
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

//! Order history route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{instrument, warn};

use shopfront_core::auth::AuthInfo;
use shopfront_core::order::CustomerOrder;
use shopfront_core::types::{Currency, OrderStatus};

use crate::error::Result;
use crate::middleware::{CspNonce, StoreScope};
use crate::models::Flash;
use crate::routes::layout::{Layout, Shop};
use crate::state::AppState;

/// Order line display data.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub variant: Option<String>,
    pub quantity: u32,
    pub line_total: String,
}

/// Order display data.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub reference: String,
    pub placed_on: String,
    pub status: OrderStatus,
    pub delivery_status: OrderStatus,
    pub payment_method: String,
    pub lines: Vec<OrderLineView>,
    pub total: String,
}

impl OrderView {
    /// Format an order in the currency it was placed in, falling back to
    /// the store's current currency.
    #[must_use]
    pub fn new(order: &CustomerOrder, fallback: &Currency) -> Self {
        let currency = if order.currency_code.is_empty() || order.currency_code == fallback.code {
            fallback.clone()
        } else {
            Currency::new(order.currency_code.as_str(), format!("{} ", order.currency_code))
        };

        Self {
            reference: order.reference(),
            placed_on: order.placed_on(),
            status: order.order_status.clone(),
            delivery_status: order.delivery_status.clone(),
            payment_method: order.payment.method.clone(),
            lines: order
                .products
                .iter()
                .map(|line| OrderLineView {
                    name: line.product_name.clone(),
                    variant: line.variant_label(),
                    quantity: line.quantity,
                    line_total: currency.format(line.line_total),
                })
                .collect(),
            total: currency.format(order.pricing_summary.grand_total),
        }
    }
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
    pub load_failed: bool,
}

/// Display the signed-in customer's orders, newest first.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn index(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<Response> {
    let Some(auth) = AuthInfo::load(&mut scope.storage) else {
        let session = scope.storage.session().clone();
        scope.save().await?;
        Flash::error("Please sign in to see your orders.").push(&session).await;
        return Ok(Redirect::to("/login").into_response());
    };

    let shop = Shop::load(&state, &mut scope).await;
    let (mut orders, load_failed) = match state.backend().customer_orders(&auth).await {
        Ok(orders) => (orders, false),
        Err(e) => {
            warn!(error = %e, "order history unavailable");
            (Vec::new(), true)
        }
    };
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let currency = shop.currency();
    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Your orders")).await?;
    scope.save().await?;

    Ok(OrdersTemplate {
        layout,
        orders: orders.iter().map(|o| OrderView::new(o, &currency)).collect(),
        load_failed,
    }
    .into_response())
}

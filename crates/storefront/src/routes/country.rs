//! Country and currency selection.
//!
//! A store with several countries asks the visitor to pick one before they
//! can shop. Switching later is free while the cart is empty; with items in
//! the cart the switch waits for an explicit confirmation and then empties
//! the cart, since its prices belong to the old currency.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, instrument};

use shopfront_core::cart::Cart;
use shopfront_core::country::{Country, CountrySelector, SwitchOutcome};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{CspNonce, StoreScope};
use crate::models::Flash;
use crate::routes::cart::CART_UPDATED;
use crate::routes::layout::{CountryOption, Layout, Shop, find_country};
use crate::state::AppState;

/// Country form data. `country` is a [`crate::routes::layout::country_key`].
#[derive(Debug, Deserialize)]
pub struct CountryForm {
    pub country: String,
}

/// Region selection page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/country_select.html")]
pub struct CountrySelectTemplate {
    pub layout: Layout,
    pub options: Vec<CountryOption>,
    /// Rendered confirmation dialog for a pending switch.
    pub confirm: Option<String>,
}

/// Footer switcher fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "fragments/country_switcher.html")]
pub struct CountrySwitcherTemplate {
    pub options: Vec<CountryOption>,
}

/// Switch confirmation dialog template.
#[derive(Template, WebTemplate)]
#[template(path = "fragments/country_confirm.html")]
pub struct ConfirmSwitchTemplate {
    pub key: String,
    pub name: String,
    pub currency: String,
}

impl ConfirmSwitchTemplate {
    fn new(key: String, country: Country) -> Self {
        Self {
            key,
            currency: country.currency_label(),
            name: country.country_name,
        }
    }
}

/// True for requests made by HTMX.
fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Reload the current page: a full refresh for HTMX, else a redirect home.
fn reload(headers: &HeaderMap) -> Response {
    if is_htmx(headers) {
        (AppendHeaders([("HX-Refresh", "true")]), Html("")).into_response()
    } else {
        Redirect::to("/").into_response()
    }
}

fn requested_country(shop: &Shop, form: &CountryForm) -> Result<Country> {
    find_country(&shop.preference, &form.country)
        .ok_or_else(|| AppError::BadRequest("That country is not available in this store.".to_owned()))
}

/// Region picker page.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn select_page(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<impl IntoResponse> {
    let shop = Shop::load(&state, &mut scope).await;
    let options = CountryOption::list(shop.preference.countries(), shop.country.as_ref());

    let mut layout = Layout::load(&state, &scope, &shop, nonce, Some("Choose your region")).await?;
    // This page is the picker.
    layout.region_picker.clear();
    scope.save().await?;

    Ok(CountrySelectTemplate {
        layout,
        options,
        confirm: None,
    })
}

/// Save a choice from the region picker and go home.
///
/// Changing an existing choice while the cart has items re-renders the
/// picker with the confirmation dialog instead.
#[instrument(skip_all, fields(store_id = %scope.store_id, country = %form.country))]
pub async fn select(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
    Form(form): Form<CountryForm>,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    let target = requested_country(&shop, &form)?;

    let cart_is_empty = Cart::load(&mut scope.storage).is_empty();
    let outcome = CountrySelector::load(&mut scope.storage, scope.store_id.clone()).choose_country(
        &shop.preference,
        target,
        cart_is_empty,
    );

    let country = match outcome {
        SwitchOutcome::NeedsConfirmation(country) => country,
        SwitchOutcome::Switched(country) => {
            scope.save().await?;
            info!(country = %country.country_name, "country selected");
            return Ok(Redirect::to("/").into_response());
        }
        SwitchOutcome::Unchanged => {
            scope.save().await?;
            return Ok(Redirect::to("/").into_response());
        }
    };

    let options = CountryOption::list(shop.preference.countries(), shop.country.as_ref());
    let confirm = ConfirmSwitchTemplate::new(form.country, country).render()?;
    let mut layout = Layout::load(&state, &scope, &shop, nonce, Some("Choose your region")).await?;
    layout.region_picker.clear();
    scope.save().await?;

    Ok(CountrySelectTemplate {
        layout,
        options,
        confirm: Some(confirm),
    }
    .into_response())
}

/// Ask to switch country.
///
/// Switches right away when the cart is empty, does nothing for the current
/// country and otherwise answers with a confirmation dialog for `#modal`.
#[instrument(skip_all, fields(store_id = %scope.store_id, country = %form.country))]
pub async fn switch(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut scope: StoreScope,
    Form(form): Form<CountryForm>,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    let target = requested_country(&shop, &form)?;

    let cart_is_empty = Cart::load(&mut scope.storage).is_empty();
    let outcome = CountrySelector::load(&mut scope.storage, scope.store_id.clone()).request_switch(
        &shop.preference,
        target,
        cart_is_empty,
    );
    scope.save().await?;

    Ok(match outcome {
        SwitchOutcome::Unchanged => Html("").into_response(),
        SwitchOutcome::Switched(country) => {
            info!(country = %country.country_name, "country switched");
            reload(&headers)
        }
        SwitchOutcome::NeedsConfirmation(country) => {
            ConfirmSwitchTemplate::new(form.country, country).into_response()
        }
    })
}

/// Apply a confirmed switch and empty the cart.
#[instrument(skip_all, fields(store_id = %scope.store_id, country = %form.country))]
pub async fn confirm_switch(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut scope: StoreScope,
    Form(form): Form<CountryForm>,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    let target = requested_country(&shop, &form)?;
    let name = target.country_name.clone();

    CountrySelector::load(&mut scope.storage, scope.store_id.clone()).confirm_switch(target)?;
    Cart::load(&mut scope.storage).clear_cart();

    let session = scope.storage.session().clone();
    scope.save().await?;

    add_breadcrumb("country", "Switched country, cart cleared", Some(&[("country", name.as_str())]));
    Flash::success(format!("Now shopping in {name}. Your cart was cleared.")).push(&session).await;

    let mut response = reload(&headers);
    let (key, value) = CART_UPDATED;
    response
        .headers_mut()
        .insert(key, axum::http::HeaderValue::from_static(value));
    Ok(response)
}

/// Footer country switcher (HTMX). Empty for single-country stores.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn switcher_fragment(State(state): State<AppState>, mut scope: StoreScope) -> Result<impl IntoResponse> {
    let shop = Shop::load(&state, &mut scope).await;
    scope.save().await?;

    let countries = shop.preference.countries();
    let options = if countries.len() > 1 {
        CountryOption::list(countries, shop.country.as_ref())
    } else {
        Vec::new()
    };
    Ok(CountrySwitcherTemplate { options })
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_reload_without_htmx_redirects_home() {
        let response = reload(&HeaderMap::new());
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/");
    }

    #[test]
    fn test_reload_with_htmx_refreshes() {
        let mut headers = HeaderMap::new();
        headers.insert("hx-request", HeaderValue::from_static("true"));
        let response = reload(&headers);
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(response.headers()["hx-refresh"], "true");
    }
}

//! Home page route handler.
//!
//! The home page is the store's theme: its body sections rendered in order
//! between the header and footer sections of the layout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{CspNonce, StoreScope};
use crate::routes::layout::{Layout, Shop, section_html, theme};
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub sections: Vec<String>,
}

/// Display the home page.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn home(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<impl IntoResponse> {
    let shop = Shop::load(&state, &mut scope).await;

    let sections = section_html(state.sections().render_all(&theme(&state, &scope).await?.body));

    let layout = Layout::load(&state, &scope, &shop, nonce, None).await?;
    scope.save().await?;

    Ok(HomeTemplate { layout, sections })
}

//! Quick-search route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{instrument, warn};

use shopfront_core::catalog::{MIN_SEARCH_LEN, SEARCH_RESULT_LIMIT};

use crate::backend::ProductQuery;
use crate::error::Result;
use crate::middleware::StoreScope;
use crate::routes::layout::Shop;
use crate::routes::products::ProductCardView;
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// The nav box submits its value as `search`.
    #[serde(default, alias = "search")]
    pub q: String,
}

impl SearchQuery {
    /// Trimmed term when it is long enough to search for.
    #[must_use]
    pub fn term(&self) -> Option<&str> {
        let term = self.q.trim();
        (term.chars().count() >= MIN_SEARCH_LEN).then_some(term)
    }
}

/// Search results template (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/search_results.html")]
pub struct SearchResultsTemplate {
    pub query: String,
    pub results: Vec<ProductCardView>,
    /// False when the term was too short to search.
    pub searched: bool,
}

/// Search suggestions endpoint (HTMX).
#[instrument(skip(state, scope), fields(store_id = %scope.store_id))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    mut scope: StoreScope,
) -> Result<impl IntoResponse> {
    let Some(term) = query.term() else {
        scope.save().await?;
        return Ok(SearchResultsTemplate {
            query: query.q.trim().to_owned(),
            results: Vec::new(),
            searched: false,
        });
    };

    let shop = Shop::load(&state, &mut scope).await;
    let products = state
        .backend()
        .products(ProductQuery {
            store_id: &scope.store_id,
            country_name: shop.country_name(),
            page: 1,
            limit: SEARCH_RESULT_LIMIT,
            search: Some(term),
        })
        .await
        .map(|page| page.data)
        .unwrap_or_else(|e| {
            warn!(error = %e, "search failed");
            Vec::new()
        });
    scope.save().await?;

    let mut results = ProductCardView::list(&products, &shop.currency(), &state.config().backend.asset_url);
    results.truncate(usize::try_from(SEARCH_RESULT_LIMIT).unwrap_or(usize::MAX));

    Ok(SearchResultsTemplate {
        query: term.to_owned(),
        results,
        searched: true,
    })
}

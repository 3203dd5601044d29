//! Per-request page context: the store's country setup and the page shell.
//!
//! Every full page renders inside `base.html`, which expects a [`Layout`]:
//! the store's title, its header and footer sections, a pending flash notice,
//! and the region picker when the visitor still has to choose a country.

use std::sync::Arc;

use askama::Template;
use tracing::warn;

use shopfront_core::country::{Country, CountrySelector, SelectionState, StorePreference};
use shopfront_core::section::{PageSections, RenderedSection};
use shopfront_core::types::Currency;

use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, StoreScope};
use crate::models::Flash;
use crate::state::AppState;

// =============================================================================
// Country context
// =============================================================================

/// The store's country configuration as seen by this visitor.
#[derive(Debug, Clone)]
pub struct Shop {
    pub preference: Arc<StorePreference>,
    pub selection: SelectionState,
    /// Selected country, else the store default.
    pub country: Option<Country>,
}

impl Shop {
    /// Load the store preference and the visitor's country choice.
    ///
    /// A single-country store is selected automatically. A failed preference
    /// fetch degrades to an unconfigured store.
    pub async fn load(state: &AppState, scope: &mut StoreScope) -> Self {
        let preference = match state.backend().store_preference(&scope.store_id).await {
            Ok(preference) => preference,
            Err(e) => {
                warn!(error = %e, "store preference unavailable");
                Arc::new(StorePreference::default())
            }
        };

        let mut selector = CountrySelector::load(&mut scope.storage, scope.store_id.clone());
        let selection = selector.ensure_selection(&preference);
        let country = selector.effective_country(&preference);

        Self {
            preference,
            selection,
            country,
        }
    }

    /// Whether the visitor must pick a country before shopping.
    #[must_use]
    pub const fn needs_selection(&self) -> bool {
        matches!(self.selection, SelectionState::Required(_))
    }

    /// Currency prices are shown in.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.country.as_ref().map_or_else(
            || Currency::new(self.preference.currency_code(), self.preference.currency_symbol()),
            Country::currency,
        )
    }

    /// Country name the catalog is filtered by.
    #[must_use]
    pub fn country_name(&self) -> Option<&str> {
        self.country
            .as_ref()
            .map(|c| c.country_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Display name of the store.
    #[must_use]
    pub fn store_name(&self) -> &str {
        self.preference.store_name.as_deref().unwrap_or_default()
    }
}

/// Form value identifying a country: its id, or its name for legacy stores.
#[must_use]
pub fn country_key(country: &Country) -> String {
    country
        .id
        .as_ref()
        .map_or_else(|| country.country_name.clone(), ToString::to_string)
}

/// Find one of the store's countries by [`country_key`].
#[must_use]
pub fn find_country(preference: &StorePreference, key: &str) -> Option<Country> {
    preference
        .countries()
        .iter()
        .find(|c| country_key(c) == key)
        .cloned()
        .or_else(|| preference.default_country().filter(|c| country_key(c) == key))
}

/// A country as offered in pickers.
#[derive(Debug, Clone)]
pub struct CountryOption {
    pub key: String,
    pub name: String,
    pub currency: String,
    pub selected: bool,
}

impl CountryOption {
    /// Options for every store country, marking `current`.
    #[must_use]
    pub fn list(countries: &[Country], current: Option<&Country>) -> Vec<Self> {
        countries
            .iter()
            .map(|c| Self {
                key: country_key(c),
                name: c.country_name.clone(),
                currency: c.currency_label(),
                selected: current.is_some_and(|cur| cur.same_as(c)),
            })
            .collect()
    }
}

// =============================================================================
// Page shell
// =============================================================================

#[derive(Template)]
#[template(path = "partials/section_placeholder.html")]
struct PlaceholderTemplate<'a> {
    text: &'a str,
}

/// Turn pipeline output into HTML blocks.
#[must_use]
pub fn section_html(sections: Vec<RenderedSection>) -> Vec<String> {
    sections
        .into_iter()
        .filter_map(|section| match section {
            RenderedSection::Rendered { html, .. } => Some(html),
            RenderedSection::Placeholder { name, .. } => {
                let text = RenderedSection::placeholder_text(&name);
                PlaceholderTemplate { text: &text }
                    .render()
                    .map_err(|e| warn!(error = %e, "failed to render section placeholder"))
                    .ok()
            }
        })
        .collect()
}

/// The store's theme sections. Failing to load them is fatal to the page.
///
/// # Errors
///
/// Returns [`AppError::Theme`] when the fetch fails or the theme is empty.
pub async fn theme(state: &AppState, scope: &StoreScope) -> Result<Arc<PageSections>> {
    state.backend().theme_sections(&scope.store_id).await.map_err(|e| {
        warn!(error = %e, "theme unavailable");
        AppError::Theme(e.to_string())
    })
}

/// Data for `base.html`.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub title: String,
    pub description: String,
    pub nonce: String,
    pub header: Vec<String>,
    pub footer: Vec<String>,
    pub flash: Option<Flash>,
    /// Non-empty when the visitor must pick a country first.
    pub region_picker: Vec<CountryOption>,
}

impl Layout {
    /// Build the shell for a page titled `page_title` (the store title is
    /// used alone when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Theme`] when the store's layout cannot be loaded.
    pub async fn load(
        state: &AppState,
        scope: &StoreScope,
        shop: &Shop,
        nonce: CspNonce,
        page_title: Option<&str>,
    ) -> Result<Self> {
        let meta = state.backend().store_meta(&scope.store_id).await;

        let sections = theme(state, scope).await?;
        let header = section_html(state.sections().render_all(&sections.header));
        let footer = section_html(state.sections().render_all(&sections.footer));

        let region_picker = match &shop.selection {
            SelectionState::Required(countries) => CountryOption::list(countries, None),
            _ => Vec::new(),
        };

        Ok(Self {
            title: page_title.map_or_else(
                || meta.title.clone(),
                |page| format!("{page} | {}", meta.title),
            ),
            description: meta.description.clone(),
            nonce: nonce.0,
            header,
            footer,
            flash: Flash::take(scope.storage.session()).await,
            region_picker,
        })
    }
}

//! Country and currency selection for a store.
//!
//! A store sells into one or more countries, each with its own currency.
//! The visitor's choice is remembered per store under
//! `store_{storeId}_country`. Because cart prices are country-scoped, a
//! switch while the cart holds items has to be confirmed and clears the cart.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::{ClientStorage, StorageError, StorageExt, keys};
use crate::types::{CountryId, Currency, StoreId};

/// A country a store sells into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CountryId>,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub currency_symbol: String,
    #[serde(default)]
    pub currency_name: String,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
}

impl Country {
    /// Currency used when this country is active.
    #[must_use]
    pub fn currency(&self) -> Currency {
        let fallback = Currency::default();
        Currency::new(
            non_empty(&self.currency_code).unwrap_or(&fallback.code),
            non_empty(&self.currency_symbol).unwrap_or(&fallback.symbol),
        )
    }

    /// Identity comparison. Names and currency codes can collide across
    /// countries, so only the id counts. Legacy countries carry no id and
    /// are keyed by name instead; an id never matches a missing one.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => !self.country_name.is_empty() && self.country_name == other.country_name,
            _ => false,
        }
    }

    /// Label such as `Euro (€)`.
    #[must_use]
    pub fn currency_label(&self) -> String {
        format!("{} ({})", self.currency_name, self.currency_symbol)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.trim().is_empty()).then_some(s)
}

/// Single-country store settings from before multi-country support.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCurrencySettings {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub currency_symbol: Option<String>,
    #[serde(default)]
    pub currency_name: Option<String>,
}

/// Store-wide preferences returned by `/store/preference/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePreference {
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub store_email: Option<String>,
    #[serde(default)]
    pub store_phone: Option<String>,
    #[serde(default)]
    pub store_telephone: Option<String>,
    #[serde(default)]
    pub store_address: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub countries: Option<Vec<Country>>,
    #[serde(default)]
    pub data: Option<LegacyCurrencySettings>,
    #[serde(default)]
    pub currency_symbol: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

impl StorePreference {
    /// Countries offered by the store (empty for legacy stores).
    #[must_use]
    pub fn countries(&self) -> &[Country] {
        self.countries.as_deref().unwrap_or_default()
    }

    /// The store's default country.
    ///
    /// Multi-country stores use the entry flagged default, else the first.
    /// Legacy stores get a synthesized country without an id.
    #[must_use]
    pub fn default_country(&self) -> Option<Country> {
        if let Some(countries) = &self.countries {
            return countries
                .iter()
                .find(|c| c.is_default)
                .or_else(|| countries.first())
                .cloned();
        }

        self.data.as_ref().map(|legacy| Country {
            id: None,
            country_name: legacy.country.clone().unwrap_or_default(),
            currency_code: legacy.currency_code.clone().unwrap_or_default(),
            currency_symbol: legacy.currency_symbol.clone().unwrap_or_default(),
            currency_name: legacy.currency_name.clone().unwrap_or_default(),
            is_default: true,
        })
    }

    /// Currency symbol for the store default, `$` if nothing says otherwise.
    #[must_use]
    pub fn currency_symbol(&self) -> String {
        self.default_country()
            .map(|c| c.currency_symbol)
            .and_then(|s| non_empty(&s).map(str::to_owned))
            .or_else(|| self.currency_symbol.clone())
            .unwrap_or_else(|| Currency::default().symbol)
    }

    /// Currency code for the store default, `USD` if nothing says otherwise.
    #[must_use]
    pub fn currency_code(&self) -> String {
        self.default_country()
            .map(|c| c.currency_code)
            .and_then(|s| non_empty(&s).map(str::to_owned))
            .or_else(|| self.currency_code.clone())
            .unwrap_or_else(|| Currency::default().code)
    }

    /// Store address including the country, for contact blocks.
    #[must_use]
    pub fn full_address(&self) -> String {
        let country = self
            .country
            .clone()
            .or_else(|| self.default_country().map(|c| c.country_name))
            .unwrap_or_default();
        match self.store_address.as_deref().filter(|a| !a.is_empty()) {
            Some(address) if !country.is_empty() => format!("{address}, {country}"),
            Some(address) => address.to_owned(),
            None => country,
        }
    }
}

/// What happened when a visitor asked to switch country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The requested country is already in effect.
    Unchanged,
    /// The cart was empty, so the switch applied immediately.
    Switched(Country),
    /// The cart has items; the switch waits for confirmation.
    NeedsConfirmation(Country),
}

/// Where the initial-selection check landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    /// A country is selected (saved earlier or auto-selected now).
    Selected(Country),
    /// The store offers several countries and none is chosen yet.
    Required(Vec<Country>),
    /// The store offers no country list; the default (if any) applies.
    NotApplicable,
}

/// Per-store country selection over client storage.
#[derive(Debug)]
pub struct CountrySelector<'a, S: ClientStorage + ?Sized> {
    storage: &'a mut S,
    store_id: StoreId,
    selected: Option<Country>,
    is_loading: bool,
}

impl<'a, S: ClientStorage + ?Sized> CountrySelector<'a, S> {
    /// Load the saved selection for `store_id`.
    ///
    /// A corrupt saved value is dropped and logged.
    pub fn load(storage: &'a mut S, store_id: StoreId) -> Self {
        let key = keys::country(&store_id);
        let selected = match storage.get_json::<Country>(&key) {
            Ok(country) => country,
            Err(e) => {
                warn!(error = %e, "discarding unreadable saved country");
                storage.remove_item(&key);
                None
            }
        };

        Self {
            storage,
            store_id,
            selected,
            is_loading: false,
        }
    }

    /// Explicitly selected country, if any.
    #[must_use]
    pub const fn selected_country(&self) -> Option<&Country> {
        self.selected.as_ref()
    }

    /// False once the saved selection has been read.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Selection if present, else the store default.
    #[must_use]
    pub fn effective_country(&self, preference: &StorePreference) -> Option<Country> {
        self.selected
            .clone()
            .or_else(|| preference.default_country())
    }

    /// Persist a new selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection could not be written. The in-memory
    /// selection is updated regardless.
    pub fn save_country(&mut self, country: Country) -> Result<(), StorageError> {
        let result = self.storage.set_json(&keys::country(&self.store_id), &country);
        self.selected = Some(country);
        result
    }

    /// Forget the selection for this store.
    pub fn clear_country(&mut self) {
        self.selected = None;
        self.storage.remove_item(&keys::country(&self.store_id));
    }

    /// Decide whether a region prompt is needed, auto-selecting a lone country.
    pub fn ensure_selection(&mut self, preference: &StorePreference) -> SelectionState {
        if let Some(country) = &self.selected {
            return SelectionState::Selected(country.clone());
        }

        match preference.countries() {
            [] => SelectionState::NotApplicable,
            [only] => {
                let only = only.clone();
                if let Err(e) = self.save_country(only.clone()) {
                    warn!(error = %e, "failed to persist auto-selected country");
                }
                SelectionState::Selected(only)
            }
            many => SelectionState::Required(many.to_vec()),
        }
    }

    /// Ask to switch to `target`.
    ///
    /// Returns [`SwitchOutcome::NeedsConfirmation`] without touching anything
    /// when the cart has items; the caller must call
    /// [`CountrySelector::confirm_switch`] to apply it.
    pub fn request_switch(
        &mut self,
        preference: &StorePreference,
        target: Country,
        cart_is_empty: bool,
    ) -> SwitchOutcome {
        if self
            .effective_country(preference)
            .is_some_and(|current| current.same_as(&target))
        {
            return SwitchOutcome::Unchanged;
        }

        if !cart_is_empty {
            return SwitchOutcome::NeedsConfirmation(target);
        }

        if let Err(e) = self.save_country(target.clone()) {
            warn!(error = %e, "failed to persist country switch");
        }
        SwitchOutcome::Switched(target)
    }

    /// Record a choice made from the region picker.
    ///
    /// A first choice is saved directly when the cart is empty or when it
    /// keeps the country already in effect. Anything else is a switch and
    /// goes through [`CountrySelector::request_switch`].
    pub fn choose_country(
        &mut self,
        preference: &StorePreference,
        target: Country,
        cart_is_empty: bool,
    ) -> SwitchOutcome {
        if self.selected.is_none()
            && (cart_is_empty
                || self
                    .effective_country(preference)
                    .is_some_and(|current| current.same_as(&target)))
        {
            if let Err(e) = self.save_country(target.clone()) {
                warn!(error = %e, "failed to persist country selection");
            }
            return SwitchOutcome::Switched(target);
        }

        self.request_switch(preference, target, cart_is_empty)
    }

    /// Apply a confirmed switch. The caller clears the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection could not be persisted.
    pub fn confirm_switch(&mut self, target: Country) -> Result<(), StorageError> {
        self.save_country(target)
    }
}

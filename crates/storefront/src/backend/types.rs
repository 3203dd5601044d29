//! Response envelopes of the commerce backend.
//!
//! Domain payloads (products, preferences, orders) live in `shopfront_core`;
//! this module only holds the wrappers around them and the few shapes the
//! core crate has no use for.

use serde::Deserialize;

use shopfront_core::StoreId;

/// `{ "data": T }` with a missing or null `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// `{ "data": [T] }` where anything other than a list is treated as empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Response of `/publish/domainInfo/{domain}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInfo {
    #[serde(default)]
    pub store_id: Option<StoreId>,
}

/// Stripe connection state of a store.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StripeStatus {
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
}

impl StripeStatus {
    /// Whether the store can take card payments.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        self.charges_enabled && self.payouts_enabled
    }
}

/// Entry of the global `/api/countries` reference list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CountryReference {
    #[serde(default, alias = "country_name")]
    pub name: String,
    #[serde(default, alias = "iso2", alias = "iso_code")]
    pub code: String,
    #[serde(default)]
    pub phone_code: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// Body of the login request.
#[derive(Debug, serde::Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of the signup request.
#[derive(Debug, serde::Serialize)]
pub struct SignupRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_country_reference_aliases() {
        let c: CountryReference = serde_json::from_value(json!({
            "country_name": "France", "iso2": "FR", "phone_code": "+33", "currency_code": "EUR"
        }))
        .unwrap();
        assert_eq!(c.name, "France");
        assert_eq!(c.code, "FR");
        assert_eq!(c.phone_code.as_deref(), Some("+33"));
    }

    #[test]
    fn test_stripe_status() {
        let s: DataEnvelope<StripeStatus> =
            serde_json::from_value(json!({"data": {"charges_enabled": true, "payouts_enabled": false}})).unwrap();
        assert!(!s.data.unwrap().is_connected());
    }

    #[test]
    fn test_envelopes_tolerate_missing_data() {
        let d: DataEnvelope<DomainInfo> = serde_json::from_value(json!({})).unwrap();
        assert!(d.data.is_none());
        let l: ListEnvelope<CountryReference> = serde_json::from_value(json!({"message": "x"})).unwrap();
        assert!(l.data.is_empty());
    }
}

//! Decimal money handling.
//!
//! The commerce backend is inconsistent about how it encodes amounts: plain
//! JSON numbers, numeric strings, and Mongo `{"$numberDecimal": "12.50"}`
//! objects all show up, sometimes within the same product document. The
//! serde helpers here accept all three so the rest of the crate only ever
//! sees [`Decimal`].

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Currency a store country prices in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code (e.g. "USD", "BDT").
    pub code: String,
    /// Display symbol (e.g. "$", "৳").
    pub symbol: String,
}

impl Currency {
    /// Create a currency from its code and symbol.
    #[must_use]
    pub fn new(code: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
        }
    }

    /// Format an amount for display, e.g. `$19.99`.
    #[must_use]
    pub fn format(&self, amount: Decimal) -> String {
        format_price(&self.symbol, amount)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::new("USD", "$")
    }
}

/// Format an amount with a currency symbol and two decimal places.
#[must_use]
pub fn format_price(symbol: &str, amount: Decimal) -> String {
    format!("{symbol}{:.2}", round_money(amount))
}

/// Round to two decimal places, midpoint away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Percentage saved relative to a compare-at price, rounded to a whole number.
///
/// Returns `None` when either amount is zero or the price is above the
/// compare-at price.
#[must_use]
pub fn discount_percent(price: Decimal, compare_at: Decimal) -> Option<u32> {
    if price.is_zero() || compare_at.is_zero() || price > compare_at {
        return None;
    }

    let percent = ((compare_at - price) / compare_at) * Decimal::ONE_HUNDRED;
    percent
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_string()
        .parse()
        .ok()
}

/// Interpret a loosely typed JSON value as a decimal amount.
#[must_use]
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Decimal::from_str(trimmed).ok()
            }
        }
        Value::Object(map) => map.get("$numberDecimal").and_then(decimal_from_value),
        _ => None,
    }
}

/// Deserialize a lenient amount; anything unreadable becomes zero.
///
/// # Errors
///
/// Only fails when the underlying deserializer fails to produce JSON.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value).unwrap_or_default())
}

/// Deserialize a lenient optional amount; anything unreadable becomes `None`.
///
/// # Errors
///
/// Only fails when the underlying deserializer fails to produce JSON.
pub fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_from_number_string_and_mongo() {
        assert_eq!(decimal_from_value(&json!(12.5)), Some(Decimal::new(125, 1)));
        assert_eq!(decimal_from_value(&json!("7")), Some(Decimal::from(7)));
        assert_eq!(
            decimal_from_value(&json!({"$numberDecimal": "19.99"})),
            Some(Decimal::new(1999, 2))
        );
    }

    #[test]
    fn test_decimal_from_garbage() {
        assert_eq!(decimal_from_value(&json!(null)), None);
        assert_eq!(decimal_from_value(&json!("")), None);
        assert_eq!(decimal_from_value(&json!("abc")), None);
        assert_eq!(decimal_from_value(&json!({"other": 1})), None);
    }

    #[derive(Deserialize)]
    struct Amounts {
        #[serde(default, deserialize_with = "deserialize_amount")]
        price: Decimal,
        #[serde(default, deserialize_with = "deserialize_optional_amount")]
        compare_at: Option<Decimal>,
    }

    #[test]
    fn test_lenient_field_deserializers() {
        let a: Amounts =
            serde_json::from_value(json!({"price": {"$numberDecimal": "10"}, "compare_at": null}))
                .unwrap();
        assert_eq!(a.price, Decimal::from(10));
        assert_eq!(a.compare_at, None);

        let b: Amounts = serde_json::from_value(json!({})).unwrap();
        assert_eq!(b.price, Decimal::ZERO);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price("$", Decimal::from(20)), "$20.00");
        assert_eq!(format_price("€", Decimal::new(19_995, 3)), "€20.00");
        assert_eq!(Currency::default().format(Decimal::new(5, 1)), "$0.50");
    }

    #[test]
    fn test_discount_percent() {
        assert_eq!(discount_percent(Decimal::from(75), Decimal::from(100)), Some(25));
        assert_eq!(discount_percent(Decimal::from(100), Decimal::from(75)), None);
        assert_eq!(discount_percent(Decimal::ZERO, Decimal::from(75)), None);
        assert_eq!(discount_percent(Decimal::from(2), Decimal::from(3)), Some(33));
    }
}

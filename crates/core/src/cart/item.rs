//! Cart line items and their persisted form.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, VariantOption};
use crate::types::price::deserialize_optional_amount;
use crate::types::{ProductId, VariantId};

/// Largest quantity a single line can hold.
pub const MAX_LINE_QUANTITY: u32 = 9999;

/// Chosen option as the order endpoints expect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartVariant {
    pub attribute_id: VariantId,
    /// Attribute name, e.g. "Size".
    #[serde(default)]
    pub name: Option<String>,
    pub value: VariantValue,
}

/// Option value inside a [`CartVariant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantValue {
    pub id: VariantId,
    pub name: String,
    pub value: String,
}

/// One cart line. Prices are frozen when the line is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredCartItem", into = "StoredCartItem")]
pub struct CartItem {
    pub id: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub thumbnail_image: Option<String>,
    /// What the customer pays per unit.
    pub actual_price: Decimal,
    /// Marketing "was" price. Always greater than `actual_price` when set.
    pub compare_at_price: Option<Decimal>,
    pub quantity: u32,
    pub has_variants: bool,
    pub variant: Option<CartVariant>,
    pub selected_variant: Option<VariantOption>,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Line id for a product and optional variant.
    #[must_use]
    pub fn line_id(product_id: &ProductId, variant_id: Option<&VariantId>) -> String {
        match variant_id {
            Some(variant) => format!("{product_id}-{variant}"),
            None => product_id.to_string(),
        }
    }

    /// Build a line for `product`, resolving its price now.
    ///
    /// A variant only counts when the product has variants enabled.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        product: &Product,
        quantity: u32,
        selected_variant: Option<&VariantOption>,
        attribute_name: Option<&str>,
    ) -> Self {
        let variants_enabled = product.variant_config().is_some_and(|v| v.enabled);
        let chosen = selected_variant.filter(|_| variants_enabled);
        let has_variants = chosen.is_some();

        let (actual_price, compare_at_price) = super::resolve_price(product, chosen);

        let thumbnail_image = chosen
            .and_then(|v| v.image.first().cloned())
            .or_else(|| product.thumbnail_image.clone());

        Self {
            id: Self::line_id(&product_id, chosen.map(|v| &v.id)),
            product_id,
            product_name: product.product_name.clone(),
            thumbnail_image,
            actual_price,
            compare_at_price,
            quantity: quantity.clamp(1, MAX_LINE_QUANTITY),
            has_variants,
            variant: chosen.map(|v| CartVariant {
                attribute_id: v.id.clone(),
                name: attribute_name.map(str::to_owned),
                value: VariantValue {
                    id: v.id.clone(),
                    name: v.name.clone(),
                    value: v.name.clone(),
                },
            }),
            selected_variant: chosen.cloned(),
            added_at: Utc::now(),
        }
    }

    /// Charged unit price. Never the compare-at price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.actual_price
    }

    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.actual_price * Decimal::from(self.quantity)
    }

    /// Savings for this line, zero unless the compare-at price is higher.
    #[must_use]
    pub fn savings(&self) -> Decimal {
        match self.compare_at_price {
            Some(compare) if compare > self.actual_price => {
                (compare - self.actual_price) * Decimal::from(self.quantity)
            }
            _ => Decimal::ZERO,
        }
    }

    /// Name of the chosen option, e.g. "Large".
    #[must_use]
    pub fn variant_label(&self) -> Option<&str> {
        self.variant.as_ref().map(|v| v.value.name.as_str())
    }
}

/// Why a stored line could not be read back.
#[derive(Debug, thiserror::Error)]
pub enum StoredItemError {
    #[error("cart line {0} has no price")]
    MissingPrice(String),
}

/// Wire form in client storage. Older lines only have `unitPrice` and
/// `discountPrice`; new lines write both aliases equal to `actualPrice`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCartItem {
    id: String,
    product_id: ProductId,
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    thumbnail_image: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_amount",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    actual_price: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_amount",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    compare_at_price: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_amount",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    unit_price: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_amount",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    discount_price: Option<Decimal>,
    quantity: u32,
    #[serde(default)]
    has_variants: bool,
    #[serde(default)]
    variant: Option<CartVariant>,
    #[serde(default)]
    selected_variant: Option<VariantOption>,
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
}

fn positive(d: Option<Decimal>) -> Option<Decimal> {
    d.filter(|v| !v.is_zero())
}

impl TryFrom<StoredCartItem> for CartItem {
    type Error = StoredItemError;

    fn try_from(stored: StoredCartItem) -> Result<Self, Self::Error> {
        let actual_price = positive(stored.actual_price)
            .or_else(|| positive(stored.discount_price))
            .or_else(|| positive(stored.unit_price))
            .or(stored.actual_price)
            .ok_or_else(|| StoredItemError::MissingPrice(stored.id.clone()))?;

        Ok(Self {
            id: stored.id,
            product_id: stored.product_id,
            product_name: stored.product_name,
            thumbnail_image: stored.thumbnail_image,
            actual_price,
            compare_at_price: stored.compare_at_price.filter(|c| *c > actual_price),
            quantity: stored.quantity.clamp(1, MAX_LINE_QUANTITY),
            has_variants: stored.has_variants,
            variant: stored.variant,
            selected_variant: stored.selected_variant,
            added_at: stored.added_at.unwrap_or_else(Utc::now),
        })
    }
}

impl From<CartItem> for StoredCartItem {
    fn from(item: CartItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            thumbnail_image: item.thumbnail_image,
            actual_price: Some(item.actual_price),
            compare_at_price: item.compare_at_price,
            unit_price: Some(item.actual_price),
            discount_price: Some(item.actual_price),
            quantity: item.quantity,
            has_variants: item.has_variants,
            variant: item.variant,
            selected_variant: item.selected_variant,
            added_at: Some(item.added_at),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_line_id() {
        let p = ProductId::new("p1");
        assert_eq!(CartItem::line_id(&p, None), "p1");
        assert_eq!(CartItem::line_id(&p, Some(&VariantId::new("v9"))), "p1-v9");
    }

    #[test]
    fn test_persisted_form_carries_aliases() {
        let item: CartItem = serde_json::from_value(json!({
            "id": "p1", "productId": "p1", "productName": "Mug",
            "actualPrice": 10, "compareAtPrice": 12, "quantity": 2
        }))
        .unwrap();

        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["actualPrice"], json!(10.0));
        assert_eq!(out["unitPrice"], json!(10.0));
        assert_eq!(out["discountPrice"], json!(10.0));
        assert_eq!(out["compareAtPrice"], json!(12.0));
        assert_eq!(out["quantity"], json!(2));
    }

    #[test]
    fn test_legacy_line_reads_discount_then_unit_price() {
        let item: CartItem = serde_json::from_value(json!({
            "id": "p1", "productId": "p1", "productName": "Mug",
            "unitPrice": 9, "discountPrice": 7, "quantity": 1
        }))
        .unwrap();
        assert_eq!(item.actual_price, Decimal::from(7));

        let item: CartItem = serde_json::from_value(json!({
            "id": "p1", "productId": "p1", "unitPrice": "9.50", "quantity": 1
        }))
        .unwrap();
        assert_eq!(item.actual_price, Decimal::new(950, 2));
    }

    #[test]
    fn test_line_without_price_is_rejected() {
        let result: Result<CartItem, _> =
            serde_json::from_value(json!({"id": "p1", "productId": "p1", "quantity": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_stored_compare_at_not_above_price_is_dropped() {
        let item: CartItem = serde_json::from_value(json!({
            "id": "p1", "productId": "p1", "actualPrice": 10, "compareAtPrice": 10, "quantity": 1
        }))
        .unwrap();
        assert_eq!(item.compare_at_price, None);
        assert_eq!(item.savings(), Decimal::ZERO);
    }
}

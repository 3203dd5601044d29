//! Cart lines reshaped for the order endpoints.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{Cart, CartItem, CartVariant};
use crate::storage::ClientStorage;
use crate::types::{CountryId, ProductId, round_money};

/// Full line detail for cash-on-delivery and bank-transfer orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodLineItem {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_id: Option<CountryId>,
    pub has_variants: bool,
    pub variant: Option<CartVariant>,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

impl CodLineItem {
    fn from_item(item: &CartItem, country_id: Option<&CountryId>) -> Self {
        Self {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            country_id: country_id.cloned(),
            has_variants: item.has_variants,
            variant: item.variant.clone(),
            quantity: item.quantity,
            unit_price: item.actual_price,
            discount_price: item.actual_price,
            tax_amount: Decimal::ZERO,
            line_total: round_money(item.line_total()),
        }
    }
}

/// Reduced line for gateway (online) orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineLineItem {
    pub product_id: ProductId,
    /// Product name with `" - {variant}"` appended for variant lines.
    pub product_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<&CartItem> for OnlineLineItem {
    fn from(item: &CartItem) -> Self {
        let product_name = match item.variant_label().filter(|_| item.has_variants) {
            Some(label) => format!("{} - {label}", item.product_name),
            None => item.product_name.clone(),
        };
        Self {
            product_id: item.product_id.clone(),
            product_name,
            quantity: item.quantity,
            price: item.actual_price,
        }
    }
}

/// COD/bank lines for `items`, tagging each with the country when given.
#[must_use]
pub fn cod_line_items(items: &[CartItem], country_id: Option<&CountryId>) -> Vec<CodLineItem> {
    items
        .iter()
        .map(|item| CodLineItem::from_item(item, country_id))
        .collect()
}

/// Online lines for `items`.
#[must_use]
pub fn online_line_items(items: &[CartItem]) -> Vec<OnlineLineItem> {
    items.iter().map(OnlineLineItem::from).collect()
}

impl<S: ClientStorage + ?Sized> Cart<'_, S> {
    /// Lines for cash-on-delivery or bank-transfer orders.
    #[must_use]
    pub fn cod_line_items(&self, country_id: Option<&CountryId>) -> Vec<CodLineItem> {
        cod_line_items(self.items(), country_id)
    }

    /// Lines for online gateway orders.
    #[must_use]
    pub fn online_line_items(&self) -> Vec<OnlineLineItem> {
        online_line_items(self.items())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::cart::VariantValue;
    use crate::types::VariantId;

    fn line(id: &str, price: i64, quantity: u32, variant: Option<&str>) -> CartItem {
        CartItem {
            id: id.into(),
            product_id: ProductId::new("p1"),
            product_name: "Shirt".into(),
            thumbnail_image: None,
            actual_price: Decimal::from(price),
            compare_at_price: None,
            quantity,
            has_variants: variant.is_some(),
            variant: variant.map(|name| CartVariant {
                attribute_id: VariantId::new("v1"),
                name: Some("Size".into()),
                value: VariantValue {
                    id: VariantId::new("v1"),
                    name: name.into(),
                    value: name.into(),
                },
            }),
            selected_variant: None,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_cod_line_shape() {
        let lines = cod_line_items(&[line("p1", 10, 2, None)], Some(&CountryId::new("c1")));
        let value = serde_json::to_value(&lines[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "productId": "p1",
                "productName": "Shirt",
                "countryId": "c1",
                "hasVariants": false,
                "variant": null,
                "quantity": 2,
                "unitPrice": 10.0,
                "discountPrice": 10.0,
                "taxAmount": 0.0,
                "lineTotal": 20.0
            })
        );
    }

    #[test]
    fn test_cod_line_without_country() {
        let lines = cod_line_items(&[line("p1", 10, 1, None)], None);
        let value = serde_json::to_value(&lines[0]).unwrap();
        assert!(value.get("countryId").is_none());
    }

    #[test]
    fn test_online_line_folds_variant_name() {
        let lines = online_line_items(&[line("p1-v1", 12, 1, Some("Large")), line("p1", 5, 3, None)]);
        assert_eq!(lines[0].product_name, "Shirt - Large");
        assert_eq!(lines[1].product_name, "Shirt");
        assert_eq!(
            serde_json::to_value(&lines[1]).unwrap(),
            json!({"productId": "p1", "productName": "Shirt", "quantity": 3, "price": 5.0})
        );
    }

    #[test]
    fn test_line_total_is_rounded() {
        let mut item = line("p1", 0, 3, None);
        item.actual_price = Decimal::new(3333, 3);
        let lines = cod_line_items(&[item], None);
        assert_eq!(lines[0].line_total, Decimal::new(1000, 2));
    }
}

//! Placed orders as the customer order history returns them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::checkout::ShippingDetails;
use crate::types::price::deserialize_amount;
use crate::types::{OrderId, OrderStatus, ProductId};

/// Envelope of `/orders/customerorders/{customerId}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerOrders {
    #[serde(default)]
    pub data: Vec<CustomerOrder>,
}

/// One placed order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrder {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default = "pending")]
    pub order_status: OrderStatus,
    #[serde(default = "pending")]
    pub delivery_status: OrderStatus,
    #[serde(default)]
    pub products: Vec<OrderLine>,
    #[serde(default)]
    pub payment: OrderPayment,
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub pricing_summary: OrderTotals,
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
}

fn pending() -> OrderStatus {
    OrderStatus::Pending
}

impl CustomerOrder {
    /// Short reference shown to customers: last eight id characters, uppercased.
    #[must_use]
    pub fn reference(&self) -> String {
        let id = self.id.as_str();
        let start = id
            .char_indices()
            .rev()
            .nth(7)
            .map_or(0, |(i, _)| i);
        id[start..].to_uppercase()
    }

    /// Formatted placement date.
    #[must_use]
    pub fn placed_on(&self) -> String {
        self.created_at
            .map(|d| d.format("%B %-d, %Y").to_string())
            .unwrap_or_default()
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.products.len()
    }
}

/// One line of a placed order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: String,
    /// Either a label or the structured variant sent at checkout.
    #[serde(default)]
    pub variant: Value,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub unit_price: Decimal,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub line_total: Decimal,
}

impl OrderLine {
    /// Readable variant label, if any.
    #[must_use]
    pub fn variant_label(&self) -> Option<String> {
        match &self.variant {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(map) => map
                .get("value")
                .and_then(|v| v.get("name"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        }
    }
}

/// Payment block of a placed order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayment {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Totals of a placed order. Amounts may arrive as `$numberDecimal` objects.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub sub_total: Decimal,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub shipping_charges: Decimal,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub tax_total: Decimal,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub discount_total: Decimal,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub grand_total: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_order_history() {
        let orders: CustomerOrders = serde_json::from_value(json!({
            "data": [{
                "_id": "65f0c0ffee1234abcd",
                "createdAt": "2024-03-05T10:00:00Z",
                "orderStatus": "Delivered",
                "deliveryStatus": "Shipped",
                "products": [
                    {"_id": "l1", "productName": "Mug", "variant": "Blue", "quantity": 2, "unitPrice": 5, "lineTotal": 10},
                    {"productName": "Shirt", "variant": {"value": {"name": "L"}}, "quantity": 1, "unitPrice": "7.5", "lineTotal": "7.5"}
                ],
                "payment": {"method": "COD"},
                "currencyCode": "USD",
                "pricingSummary": {"subTotal": 17.5, "discountTotal": {"$numberDecimal": "1.25"}, "grandTotal": 16.25}
            }]
        }))
        .unwrap();

        let order = &orders.data[0];
        assert_eq!(order.reference(), "1234ABCD");
        assert_eq!(order.placed_on(), "March 5, 2024");
        assert_eq!(order.order_status, OrderStatus::Delivered);
        assert_eq!(order.delivery_status, OrderStatus::Other("Shipped".into()));
        assert_eq!(order.line_count(), 2);
        assert_eq!(order.products[0].variant_label().as_deref(), Some("Blue"));
        assert_eq!(order.products[1].variant_label().as_deref(), Some("L"));
        assert_eq!(order.products[1].unit_price, Decimal::new(75, 1));
        assert_eq!(order.pricing_summary.discount_total, Decimal::new(125, 2));
        assert_eq!(order.pricing_summary.shipping_charges, Decimal::ZERO);
    }

    #[test]
    fn test_short_reference() {
        let order: CustomerOrder = serde_json::from_value(json!({"_id": "abc"})).unwrap();
        assert_eq!(order.reference(), "ABC");
        assert_eq!(order.placed_on(), "");
    }
}

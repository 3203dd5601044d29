//! Checkout: shipping form validation, payment methods, and order payloads.
//!
//! One checkout attempt moves through
//! `Idle → Validating → Invalid | Submitting → Succeeded | Failed`.
//! Invalid and failed attempts return to idle with their errors so the form
//! can be corrected and resubmitted with its contents intact.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{CartItem, CodLineItem, OnlineLineItem, cod_line_items, online_line_items, subtotal};
use crate::country::Country;
use crate::form::FieldErrors;
use crate::types::{Email, round_money};

fn default_phone_code() -> String {
    "+91".to_owned()
}

/// Shipping form as posted and as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_phone_code")]
    pub country_phone_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub zip_code: String,
}

impl Default for ShippingDetails {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            country_phone_code: default_phone_code(),
            phone: String::new(),
            address_line1: String::new(),
            address_line2: String::new(),
            city: String::new(),
            state: String::new(),
            country: String::new(),
            zip_code: String::new(),
        }
    }
}

impl ShippingDetails {
    /// Validate every required field.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        errors.require("name", &self.name, "Name is required");
        validate_email(&mut errors, &self.email);
        errors.require("phone", &self.phone, "Phone is required");
        errors.require("addressLine1", &self.address_line1, "Address is required");
        errors.require("city", &self.city, "City is required");
        errors.require("state", &self.state, "State is required");
        errors.require("country", &self.country, "Country is required");
        errors.require("zipCode", &self.zip_code, "Zip code is required");

        errors
    }
}

/// Add the standard email messages for `value` under `email`.
pub fn validate_email(errors: &mut FieldErrors, value: &str) {
    if let Err(e) = Email::parse(value) {
        errors.add("email", e.to_string());
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "COD")]
    CashOnDelivery,
    #[serde(rename = "Bank")]
    BankTransfer,
    #[serde(rename = "Online")]
    Online,
}

impl PaymentMethod {
    /// Backend path the order is posted to.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "/orders/create/cod",
            Self::BankTransfer => "/v2/store/global/orders/create/cod",
            Self::Online => "/v2/store/global/orders/create/online",
        }
    }

    /// Notice after a successful submission.
    #[must_use]
    pub const fn success_message(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Order placed successfully!",
            Self::BankTransfer => "Order created! Please complete the bank transfer.",
            Self::Online => "Redirecting to payment gateway...",
        }
    }

    /// Message after a failed submission.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Failed to place order. Please try again.",
            Self::BankTransfer => "Failed to create order. Please try again.",
            Self::Online => "Failed to initiate payment. Please try again.",
        }
    }

    /// Form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "COD",
            Self::BankTransfer => "Bank",
            Self::Online => "Online",
        }
    }
}

/// Payment methods besides cash on delivery that a store can take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvailableMethods {
    /// Bank payment config is active.
    pub bank_transfer: bool,
    /// A payment gateway is connected.
    pub online: bool,
}

impl AvailableMethods {
    /// Whether `method` can be used. Cash on delivery always can.
    #[must_use]
    pub const fn allows(self, method: PaymentMethod) -> bool {
        match method {
            PaymentMethod::CashOnDelivery => true,
            PaymentMethod::BankTransfer => self.bank_transfer,
            PaymentMethod::Online => self.online,
        }
    }
}

/// Store bank account shown for bank-transfer orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub routing_number: Option<String>,
    #[serde(default)]
    pub swift_code: Option<String>,
}

/// Order totals. Shipping, tax and discount are not modeled yet and are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_charges: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub grand_total: Decimal,
}

impl PricingSummary {
    /// Summary for a subtotal, rounded to cents.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let rounded = round_money(subtotal);
        Self {
            sub_total: rounded,
            shipping_charges: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            grand_total: rounded,
        }
    }
}

/// Payment block of a COD or bank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentInfo {
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
}

/// Body of a COD or bank-transfer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineOrder {
    pub products: Vec<CodLineItem>,
    pub pricing_summary: PricingSummary,
    pub currency_code: String,
    pub payment: PaymentInfo,
    pub shipping_details: ShippingDetails,
}

/// Body of an online (gateway) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineOrder {
    pub products: Vec<OnlineLineItem>,
    #[serde(rename = "currency_code")]
    pub currency_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub payment_method: &'static str,
    pub shipping_details: ShippingDetails,
}

/// An order ready to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrderRequest {
    Offline(OfflineOrder),
    Online(OnlineOrder),
}

/// Build the payload for `method`.
///
/// Cash-on-delivery lines carry the effective country id; bank-transfer
/// lines do not.
#[must_use]
pub fn build_order(
    method: PaymentMethod,
    items: &[CartItem],
    country: Option<&Country>,
    currency_code: &str,
    shipping: ShippingDetails,
) -> OrderRequest {
    let total = subtotal(items);
    match method {
        PaymentMethod::CashOnDelivery => OrderRequest::Offline(OfflineOrder {
            products: cod_line_items(items, country.and_then(|c| c.id.as_ref())),
            pricing_summary: PricingSummary::from_subtotal(total),
            currency_code: currency_code.to_owned(),
            payment: PaymentInfo {
                method: "COD",
                status: None,
            },
            shipping_details: shipping,
        }),
        PaymentMethod::BankTransfer => OrderRequest::Offline(OfflineOrder {
            products: cod_line_items(items, None),
            pricing_summary: PricingSummary::from_subtotal(total),
            currency_code: currency_code.to_owned(),
            payment: PaymentInfo {
                method: "Bank Transfer",
                status: Some("Pending"),
            },
            shipping_details: shipping,
        }),
        PaymentMethod::Online => OrderRequest::Online(OnlineOrder {
            products: online_line_items(items),
            currency_code: currency_code.to_owned(),
            total_amount: round_money(total),
            payment_method: "Online",
            shipping_details: shipping,
        }),
    }
}

/// Why a submission was refused before reaching the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("please correct the highlighted fields")]
    Invalid(FieldErrors),
    #[error("an order is already being submitted")]
    AlreadySubmitting,
    #[error("your cart is empty")]
    EmptyCart,
    #[error("bank transfer is not available for this store")]
    BankTransferUnavailable,
    #[error("online payment is not available for this store")]
    OnlineUnavailable,
}

/// Where a checkout attempt stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Validating,
    Invalid(FieldErrors),
    Submitting(PaymentMethod),
    Succeeded(PaymentMethod),
    Failed { method: PaymentMethod, message: String },
}

/// Drives one checkout attempt.
#[derive(Debug, Clone, Default)]
pub struct CheckoutFlow {
    state: CheckoutState,
}

impl CheckoutFlow {
    /// New idle flow.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// True while a submission is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, CheckoutState::Submitting(_))
    }

    /// Validate and, if everything checks out, move to submitting.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when already submitting, the cart is empty,
    /// the chosen payment method is unavailable, or the form is invalid.
    pub fn submit(
        &mut self,
        form: &ShippingDetails,
        method: PaymentMethod,
        items: &[CartItem],
        available: AvailableMethods,
    ) -> Result<(), CheckoutError> {
        if self.is_pending() {
            return Err(CheckoutError::AlreadySubmitting);
        }

        self.state = CheckoutState::Validating;

        if items.is_empty() {
            self.state = CheckoutState::Idle;
            return Err(CheckoutError::EmptyCart);
        }
        if !available.allows(method) {
            self.state = CheckoutState::Idle;
            return Err(match method {
                PaymentMethod::Online => CheckoutError::OnlineUnavailable,
                _ => CheckoutError::BankTransferUnavailable,
            });
        }

        let errors = form.validate();
        if !errors.is_empty() {
            self.state = CheckoutState::Invalid(errors.clone());
            return Err(CheckoutError::Invalid(errors));
        }

        self.state = CheckoutState::Submitting(method);
        Ok(())
    }

    /// Record the backend's answer. Returns the message to show.
    pub fn complete(&mut self, accepted: bool) -> &'static str {
        let method = match self.state {
            CheckoutState::Submitting(m) => m,
            _ => PaymentMethod::default(),
        };

        if accepted {
            self.state = CheckoutState::Succeeded(method);
            method.success_message()
        } else {
            let message = method.failure_message();
            self.state = CheckoutState::Failed {
                method,
                message: message.to_owned(),
            };
            message
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::types::{CountryId, ProductId};

    fn item(price: i64, quantity: u32) -> CartItem {
        CartItem {
            id: "p1".into(),
            product_id: ProductId::new("p1"),
            product_name: "Mug".into(),
            thumbnail_image: None,
            actual_price: Decimal::from(price),
            compare_at_price: None,
            quantity,
            has_variants: false,
            variant: None,
            selected_variant: None,
            added_at: Utc::now(),
        }
    }

    const ONLINE: AvailableMethods = AvailableMethods {
        bank_transfer: false,
        online: true,
    };

    fn filled_form() -> ShippingDetails {
        ShippingDetails {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "123".into(),
            address_line1: "1 Main".into(),
            city: "Town".into(),
            state: "ST".into(),
            country: "FR".into(),
            zip_code: "0000".into(),
            ..ShippingDetails::default()
        }
    }

    fn country() -> Country {
        Country {
            id: Some(CountryId::new("c1")),
            country_name: "France".into(),
            currency_code: "EUR".into(),
            currency_symbol: "€".into(),
            currency_name: "Euro".into(),
            is_default: true,
        }
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let errors = ShippingDetails::default().validate();
        assert_eq!(errors.len(), 8);
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("addressLine1"), Some("Address is required"));
        assert_eq!(errors.get("zipCode"), Some("Zip code is required"));
        assert_eq!(errors.get("addressLine2"), None);
    }

    #[test]
    fn test_invalid_email_message() {
        let form = ShippingDetails {
            email: "ada@example".into(),
            ..filled_form()
        };
        let errors = form.validate();
        assert_eq!(errors.get("email"), Some("Invalid email format"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_cod_pricing_summary() {
        let order = build_order(
            PaymentMethod::CashOnDelivery,
            &[item(10, 2)],
            Some(&country()),
            "EUR",
            filled_form(),
        );
        let value = serde_json::to_value(&order).unwrap();

        assert_eq!(
            value["pricingSummary"],
            json!({"subTotal": 20.0, "shippingCharges": 0.0, "taxTotal": 0.0, "discountTotal": 0.0, "grandTotal": 20.0})
        );
        assert_eq!(value["payment"], json!({"method": "COD"}));
        assert_eq!(value["products"][0]["countryId"], json!("c1"));
        assert_eq!(value["currencyCode"], json!("EUR"));
        assert_eq!(value["shippingDetails"]["addressLine1"], json!("1 Main"));
    }

    #[test]
    fn test_bank_order_has_pending_status_and_no_country() {
        let order = build_order(PaymentMethod::BankTransfer, &[item(5, 1)], Some(&country()), "EUR", filled_form());
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["payment"], json!({"method": "Bank Transfer", "status": "Pending"}));
        assert!(value["products"][0].get("countryId").is_none());
    }

    #[test]
    fn test_online_order_shape() {
        let order = build_order(PaymentMethod::Online, &[item(5, 3)], Some(&country()), "EUR", filled_form());
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["currency_code"], json!("EUR"));
        assert_eq!(value["totalAmount"], json!(15.0));
        assert_eq!(value["paymentMethod"], json!("Online"));
        assert_eq!(value["products"][0]["price"], json!(5.0));
    }

    #[test]
    fn test_payment_endpoints() {
        assert_eq!(PaymentMethod::CashOnDelivery.endpoint(), "/orders/create/cod");
        assert_eq!(PaymentMethod::BankTransfer.endpoint(), "/v2/store/global/orders/create/cod");
        assert_eq!(PaymentMethod::Online.endpoint(), "/v2/store/global/orders/create/online");
    }

    #[test]
    fn test_flow_invalid_then_success() {
        let mut flow = CheckoutFlow::new();
        let items = [item(10, 1)];

        let err = flow
            .submit(&ShippingDetails::default(), PaymentMethod::CashOnDelivery, &items, AvailableMethods::default())
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(_)));
        assert!(matches!(flow.state(), CheckoutState::Invalid(_)));

        flow.submit(&filled_form(), PaymentMethod::CashOnDelivery, &items, AvailableMethods::default()).unwrap();
        assert!(flow.is_pending());
        assert_eq!(
            flow.submit(&filled_form(), PaymentMethod::CashOnDelivery, &items, AvailableMethods::default()),
            Err(CheckoutError::AlreadySubmitting)
        );

        assert_eq!(flow.complete(true), "Order placed successfully!");
        assert_eq!(flow.state(), &CheckoutState::Succeeded(PaymentMethod::CashOnDelivery));
    }

    #[test]
    fn test_flow_failure_allows_retry() {
        let mut flow = CheckoutFlow::new();
        let items = [item(10, 1)];
        flow.submit(&filled_form(), PaymentMethod::Online, &items, ONLINE).unwrap();
        assert_eq!(flow.complete(false), "Failed to initiate payment. Please try again.");
        assert!(!flow.is_pending());
        assert!(flow.submit(&filled_form(), PaymentMethod::Online, &items, ONLINE).is_ok());
    }

    #[test]
    fn test_flow_guards() {
        let mut flow = CheckoutFlow::new();
        let none = AvailableMethods::default();
        assert_eq!(
            flow.submit(&filled_form(), PaymentMethod::CashOnDelivery, &[], none),
            Err(CheckoutError::EmptyCart)
        );
        assert_eq!(
            flow.submit(&filled_form(), PaymentMethod::BankTransfer, &[item(1, 1)], none),
            Err(CheckoutError::BankTransferUnavailable)
        );
        assert_eq!(
            flow.submit(&filled_form(), PaymentMethod::Online, &[item(1, 1)], none),
            Err(CheckoutError::OnlineUnavailable)
        );
        assert!(!flow.is_pending());
    }

    #[test]
    fn test_available_methods() {
        assert!(AvailableMethods::default().allows(PaymentMethod::CashOnDelivery));
        assert!(!AvailableMethods::default().allows(PaymentMethod::Online));
        assert!(ONLINE.allows(PaymentMethod::Online));
        assert!(!ONLINE.allows(PaymentMethod::BankTransfer));
    }

    #[test]
    fn test_payment_method_form_values() {
        let m: PaymentMethod = serde_json::from_str("\"Bank\"").unwrap();
        assert_eq!(m, PaymentMethod::BankTransfer);
        assert_eq!(PaymentMethod::Online.as_str(), "Online");
    }
}

//! Shopping cart engine.
//!
//! The cart is a list of [`CartItem`]s keyed by line id (product id, plus
//! variant id for variant lines) and persisted as JSON under the `cart`
//! storage key after every mutation. The key is removed once the cart is
//! empty. Storage problems are logged and never surface to the caller: an
//! unreadable cart loads as an empty one.

mod item;
mod projection;

pub use item::{CartItem, CartVariant, MAX_LINE_QUANTITY, StoredItemError, VariantValue};
pub use projection::{CodLineItem, OnlineLineItem, cod_line_items, online_line_items};

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::catalog::{Product, VariantOption};
use crate::storage::{ClientStorage, StorageExt, keys};
use crate::types::{ProductId, VariantId, round_money};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The product document carried neither `_id` nor `productId`.
    #[error("product has no id")]
    MissingProductId,
}

/// User-facing notice produced by a cart operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartNotice {
    Added,
    AlreadyInCart,
    Removed,
    Cleared,
}

impl CartNotice {
    /// Toast text.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Added => "Added to cart successfully",
            Self::AlreadyInCart => "Item is already in cart",
            Self::Removed => "Removed from cart",
            Self::Cleared => "Cart cleared",
        }
    }
}

/// Resolve the charged and compare-at price for a product and optional variant.
///
/// * No variant: product price, product compare-at.
/// * Variant with default pricing: same as no variant.
/// * Variant with its own pricing: the variant price if positive, else the
///   product price; the variant's compare-at.
///
/// A compare-at price is only kept when it is above the charged price.
#[must_use]
pub fn resolve_price(product: &Product, variant: Option<&VariantOption>) -> (Decimal, Option<Decimal>) {
    let default_pricing = product
        .variant_config()
        .is_none_or(|v| v.uses_default_pricing());

    let (actual, compare_at) = match variant {
        Some(v) if !default_pricing => {
            let own = v.price.filter(|p| p > &Decimal::ZERO);
            (own.unwrap_or_else(|| product.price()), v.discount_price)
        }
        _ => (product.price(), product.compare_at()),
    };

    (actual, compare_at.filter(|c| *c > actual))
}

/// Sum of quantities.
#[must_use]
pub fn total_items(items: &[CartItem]) -> u32 {
    items.iter().fold(0, |total, i| total.saturating_add(i.quantity))
}

/// Identifies one particular cart: its lines, quantities and when each line
/// was added. Re-adding an item after an order gives a new fingerprint.
#[must_use]
pub fn fingerprint(items: &[CartItem]) -> String {
    items
        .iter()
        .map(|i| format!("{}x{}@{}", i.id, i.quantity, i.added_at.timestamp_micros()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Sum of charged price × quantity.
#[must_use]
pub fn subtotal(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

/// Sum of (compare-at − charged) × quantity over discounted lines.
#[must_use]
pub fn total_savings(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::savings).sum()
}

/// A visitor's cart bound to their client storage.
#[derive(Debug)]
pub struct Cart<'a, S: ClientStorage + ?Sized> {
    storage: &'a mut S,
    items: Vec<CartItem>,
}

impl<'a, S: ClientStorage + ?Sized> Cart<'a, S> {
    /// Load the cart from storage. Corrupt data yields an empty cart.
    pub fn load(storage: &'a mut S) -> Self {
        let items = match storage.get_json::<Vec<CartItem>>(keys::CART) {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "discarding unreadable cart");
                storage.remove_item(keys::CART);
                Vec::new()
            }
        };

        Self { storage, items }
    }

    /// Current lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// True when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `product` (optionally a specific variant) to the cart.
    ///
    /// Adding a line that already exists changes nothing and reports
    /// [`CartNotice::AlreadyInCart`].
    ///
    /// # Errors
    ///
    /// Returns [`CartError::MissingProductId`] if the product has no id.
    pub fn add_to_cart(
        &mut self,
        product: &Product,
        quantity: u32,
        selected_variant: Option<&VariantOption>,
        attribute_name: Option<&str>,
    ) -> Result<CartNotice, CartError> {
        let product_id = product.id().cloned().ok_or(CartError::MissingProductId)?;
        let item = CartItem::new(product_id, product, quantity, selected_variant, attribute_name);

        if self.items.iter().any(|existing| existing.id == item.id) {
            debug!(line = %item.id, "line already in cart");
            return Ok(CartNotice::AlreadyInCart);
        }

        debug!(line = %item.id, price = %item.actual_price, "adding line to cart");
        self.items.push(item);
        self.persist();
        Ok(CartNotice::Added)
    }

    /// Remove a line. Unknown ids are ignored.
    pub fn remove_from_cart(&mut self, line_id: &str) -> CartNotice {
        let before = self.items.len();
        self.items.retain(|item| item.id != line_id);
        if self.items.len() != before {
            self.persist();
        }
        CartNotice::Removed
    }

    /// Set a line's quantity. Anything below 1 removes the line; anything
    /// above [`MAX_LINE_QUANTITY`] is capped.
    pub fn update_quantity(&mut self, line_id: &str, quantity: i64) -> Option<CartNotice> {
        if quantity < 1 {
            return Some(self.remove_from_cart(line_id));
        }
        let quantity = u32::try_from(quantity).map_or(MAX_LINE_QUANTITY, |q| q.min(MAX_LINE_QUANTITY));

        if let Some(item) = self.items.iter_mut().find(|item| item.id == line_id) {
            item.quantity = quantity;
            self.persist();
        }
        None
    }

    /// Empty the cart and drop the storage key.
    pub fn clear_cart(&mut self) -> CartNotice {
        self.items.clear();
        self.storage.remove_item(keys::CART);
        CartNotice::Cleared
    }

    /// Charged unit price of a line.
    #[must_use]
    pub const fn get_item_price(item: &CartItem) -> Decimal {
        item.price()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        total_items(&self.items)
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        subtotal(&self.items)
    }

    /// Sum of savings against compare-at prices.
    #[must_use]
    pub fn total_savings(&self) -> Decimal {
        total_savings(&self.items)
    }

    /// Subtotal rounded for display and payloads.
    #[must_use]
    pub fn rounded_subtotal(&self) -> Decimal {
        round_money(self.subtotal())
    }

    /// Whether a product (and variant) already has a line.
    #[must_use]
    pub fn is_in_cart(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        let id = CartItem::line_id(product_id, variant_id);
        self.items.iter().any(|item| item.id == id)
    }

    /// Quantity of a product (and variant), zero if absent.
    #[must_use]
    pub fn get_item_quantity(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> u32 {
        let id = CartItem::line_id(product_id, variant_id);
        self.items
            .iter()
            .find(|item| item.id == id)
            .map_or(0, |item| item.quantity)
    }

    fn persist(&mut self) {
        if self.items.is_empty() {
            self.storage.remove_item(keys::CART);
            return;
        }
        if let Err(e) = self.storage.set_json(keys::CART, &self.items) {
            warn!(error = %e, "failed to persist cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::{VariantAttribute, VariantConfig};
    use crate::storage::MemoryStorage;

    fn simple(id: &str, price: i64, compare_at: Option<i64>) -> Product {
        Product {
            mongo_id: Some(ProductId::new(id)),
            product_name: format!("Product {id}"),
            thumbnail_image: Some(format!("/img/{id}.png")),
            product_price: Decimal::from(price),
            product_discount: compare_at.map(Decimal::from),
            ..Product::default()
        }
    }

    fn option(id: &str, name: &str, price: Option<i64>, compare_at: Option<i64>) -> VariantOption {
        VariantOption {
            id: VariantId::new(id),
            name: name.into(),
            sku: None,
            price: price.map(Decimal::from),
            discount_price: compare_at.map(Decimal::from),
            image: vec![format!("/img/{id}.png")],
        }
    }

    fn with_variants(mut product: Product, default_pricing: Option<bool>, options: Vec<VariantOption>) -> Product {
        product.variants = Some(VariantConfig {
            enabled: true,
            use_default_pricing: default_pricing,
            attributes: vec![VariantAttribute {
                name: "Size".into(),
                required: true,
                value: options,
            }],
        });
        product
    }

    #[test]
    fn test_add_simple_product_twice_is_noop() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        let p = simple("p1", 10, None);

        assert_eq!(cart.add_to_cart(&p, 3, None, None).unwrap(), CartNotice::Added);
        assert_eq!(cart.add_to_cart(&p, 1, None, None).unwrap(), CartNotice::AlreadyInCart);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.subtotal(), Decimal::from(30));
    }

    #[test]
    fn test_variant_lines_are_distinct_and_deterministic() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        let small = option("s", "Small", Some(5), None);
        let large = option("l", "Large", Some(7), None);
        let p = with_variants(simple("p1", 10, None), Some(false), vec![small.clone(), large.clone()]);

        cart.add_to_cart(&p, 1, Some(&small), Some("Size")).unwrap();
        cart.add_to_cart(&p, 1, Some(&large), Some("Size")).unwrap();
        assert_eq!(cart.add_to_cart(&p, 1, Some(&small), Some("Size")).unwrap(), CartNotice::AlreadyInCart);

        let ids: Vec<&str> = cart.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["p1-s", "p1-l"]);
        assert!(cart.is_in_cart(&ProductId::new("p1"), Some(&VariantId::new("l"))));
        assert!(!cart.is_in_cart(&ProductId::new("p1"), None));

        let line = &cart.items()[0];
        assert!(line.has_variants);
        assert_eq!(line.thumbnail_image.as_deref(), Some("/img/s.png"));
        let variant = line.variant.as_ref().unwrap();
        assert_eq!(variant.attribute_id, VariantId::new("s"));
        assert_eq!(variant.name.as_deref(), Some("Size"));
        assert_eq!(variant.value.name, "Small");
    }

    #[test]
    fn test_price_resolution_policy() {
        let base = simple("p1", 10, Some(12));

        // No variant.
        assert_eq!(resolve_price(&base, None), (Decimal::from(10), Some(Decimal::from(12))));

        // Default pricing ignores the variant's own price.
        let own = option("v", "V", Some(99), Some(120));
        let p = with_variants(base.clone(), Some(true), vec![own.clone()]);
        assert_eq!(resolve_price(&p, Some(&own)), (Decimal::from(10), Some(Decimal::from(12))));

        // Per-variant pricing uses the variant price and compare-at.
        let p = with_variants(base.clone(), Some(false), vec![own.clone()]);
        assert_eq!(resolve_price(&p, Some(&own)), (Decimal::from(99), Some(Decimal::from(120))));

        // Missing flag behaves like per-variant pricing.
        let p = with_variants(base.clone(), None, vec![own.clone()]);
        assert_eq!(resolve_price(&p, Some(&own)), (Decimal::from(99), Some(Decimal::from(120))));

        // Zero variant price falls back to the product price.
        let free = option("z", "Z", Some(0), None);
        let p = with_variants(base, Some(false), vec![free.clone()]);
        assert_eq!(resolve_price(&p, Some(&free)), (Decimal::from(10), None));
    }

    #[test]
    fn test_compare_at_not_above_price_is_dropped() {
        assert_eq!(resolve_price(&simple("p", 10, Some(10)), None), (Decimal::from(10), None));
        assert_eq!(resolve_price(&simple("p", 10, Some(8)), None), (Decimal::from(10), None));
    }

    #[test]
    fn test_variant_ignored_when_variants_disabled() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        let v = option("v", "V", Some(3), None);

        cart.add_to_cart(&simple("p1", 10, None), 1, Some(&v), Some("Size")).unwrap();

        let line = &cart.items()[0];
        assert_eq!(line.id, "p1");
        assert!(!line.has_variants);
        assert!(line.variant.is_none());
        assert_eq!(line.actual_price, Decimal::from(10));
    }

    #[test]
    fn test_update_quantity() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        cart.add_to_cart(&simple("p1", 10, None), 1, None, None).unwrap();
        cart.add_to_cart(&simple("p2", 4, None), 1, None, None).unwrap();

        assert_eq!(cart.update_quantity("p1", 3), None);
        assert_eq!(cart.get_item_quantity(&ProductId::new("p1"), None), 3);

        assert_eq!(cart.update_quantity("p1", 0), Some(CartNotice::Removed));
        assert!(!cart.is_in_cart(&ProductId::new("p1"), None));

        assert_eq!(cart.update_quantity("p2", -5), Some(CartNotice::Removed));
        assert!(cart.is_empty());

        // Unknown line is a no-op.
        assert_eq!(cart.update_quantity("nope", 2), None);
    }

    #[test]
    fn test_quantities_are_capped() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        cart.add_to_cart(&simple("a", 1, None), u32::MAX, None, None).unwrap();
        cart.add_to_cart(&simple("b", 1, None), 1, None, None).unwrap();

        assert_eq!(cart.get_item_quantity(&ProductId::new("a"), None), MAX_LINE_QUANTITY);
        assert_eq!(cart.total_items(), MAX_LINE_QUANTITY + 1);

        cart.update_quantity("b", i64::MAX);
        assert_eq!(cart.get_item_quantity(&ProductId::new("b"), None), MAX_LINE_QUANTITY);
        assert_eq!(cart.total_items(), MAX_LINE_QUANTITY * 2);
    }

    #[test]
    fn test_total_items_saturates() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        cart.add_to_cart(&simple("a", 1, None), 1, None, None).unwrap();
        let mut lines = cart.items().to_vec();
        lines[0].quantity = u32::MAX;
        lines.push(lines[0].clone());
        assert_eq!(total_items(&lines), u32::MAX);
    }

    #[test]
    fn test_fingerprint_changes_when_the_cart_does() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        cart.add_to_cart(&simple("a", 1, None), 1, None, None).unwrap();
        let first = fingerprint(cart.items());
        assert_eq!(first, fingerprint(cart.items()));

        cart.update_quantity("a", 2);
        assert_ne!(first, fingerprint(cart.items()));
        assert!(fingerprint(&[]).is_empty());
    }

    #[test]
    fn test_totals_match_recomputation() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        cart.add_to_cart(&simple("a", 10, Some(15)), 2, None, None).unwrap();
        cart.add_to_cart(&simple("b", 3, None), 1, None, None).unwrap();
        cart.add_to_cart(&simple("c", 7, Some(7)), 4, None, None).unwrap();
        cart.update_quantity("b", 5);
        cart.remove_from_cart("c");

        let expected: Decimal = cart
            .items()
            .iter()
            .map(|i| Cart::<MemoryStorage>::get_item_price(i) * Decimal::from(i.quantity))
            .sum();
        assert_eq!(cart.subtotal(), expected);
        assert_eq!(cart.subtotal(), Decimal::from(35));
        assert_eq!(cart.total_savings(), Decimal::from(10));
        assert_eq!(cart.total_items(), 7);
    }

    #[test]
    fn test_savings_zero_without_compare_at() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        cart.add_to_cart(&simple("a", 10, None), 2, None, None).unwrap();
        cart.add_to_cart(&simple("b", 10, Some(5)), 2, None, None).unwrap();
        assert_eq!(cart.total_savings(), Decimal::ZERO);
    }

    #[test]
    fn test_persistence_and_removal_of_key() {
        let mut storage = MemoryStorage::new();
        {
            let mut cart = Cart::load(&mut storage);
            cart.add_to_cart(&simple("p1", 10, None), 2, None, None).unwrap();
        }
        assert!(storage.get_item(keys::CART).is_some());

        {
            let cart = Cart::load(&mut storage);
            assert_eq!(cart.total_items(), 2);
        }

        {
            let mut cart = Cart::load(&mut storage);
            cart.remove_from_cart("p1");
        }
        assert!(storage.get_item(keys::CART).is_none());
    }

    #[test]
    fn test_clear_cart_removes_key() {
        let mut storage = MemoryStorage::new();
        {
            let mut cart = Cart::load(&mut storage);
            cart.add_to_cart(&simple("p1", 10, None), 1, None, None).unwrap();
            assert_eq!(cart.clear_cart(), CartNotice::Cleared);
            assert!(cart.is_empty());
        }
        assert!(storage.get_item(keys::CART).is_none());
    }

    #[test]
    fn test_corrupt_cart_loads_empty() {
        let mut storage = MemoryStorage::new();
        storage.set_item(keys::CART, "[{\"broken\":".into()).unwrap();
        let cart = Cart::load(&mut storage);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_legacy_cart_loads() {
        let mut storage = MemoryStorage::new();
        storage
            .set_json(
                keys::CART,
                &json!([{"id": "p1", "productId": "p1", "productName": "Mug", "unitPrice": 10, "discountPrice": 10, "quantity": 2}]),
            )
            .unwrap();
        let cart = Cart::load(&mut storage);
        assert_eq!(cart.subtotal(), Decimal::from(20));
    }

    #[test]
    fn test_storage_failure_does_not_break_mutation() {
        let mut storage = MemoryStorage::with_quota(8);
        let mut cart = Cart::load(&mut storage);
        assert_eq!(cart.add_to_cart(&simple("p1", 10, None), 1, None, None).unwrap(), CartNotice::Added);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_product_without_id() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::load(&mut storage);
        let err = cart.add_to_cart(&Product::default(), 1, None, None).unwrap_err();
        assert_eq!(err, CartError::MissingProductId);
    }
}

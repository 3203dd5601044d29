//! Catalog types as served by the commerce backend, plus shop-page
//! filtering and sorting.

use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::price::{deserialize_amount, deserialize_optional_amount};
use crate::types::{ProductId, VariantId, discount_percent};

/// One selectable option value, e.g. "Red" under "Color".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOption {
    #[serde(rename = "_id")]
    pub id: VariantId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Override price; zero or missing means "use the product price".
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub price: Option<Decimal>,
    /// Compare-at price for this option.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub image: Vec<String>,
}

/// A variant dimension such as size or color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAttribute {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub value: Vec<VariantOption>,
}

/// Variant configuration of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantConfig {
    #[serde(default)]
    pub enabled: bool,
    /// When true every variant charges the product price. Missing is
    /// treated as false: per-variant pricing, falling back to the product
    /// price when a variant has no price of its own.
    #[serde(default)]
    pub use_default_pricing: Option<bool>,
    #[serde(default)]
    pub attributes: Vec<VariantAttribute>,
}

impl VariantConfig {
    /// Guarded read of the pricing flag.
    #[must_use]
    pub fn uses_default_pricing(&self) -> bool {
        self.use_default_pricing.unwrap_or(false)
    }

    /// Find an option by id across all attributes, with its attribute name.
    #[must_use]
    pub fn find_option(&self, id: &VariantId) -> Option<(&VariantAttribute, &VariantOption)> {
        self.attributes
            .iter()
            .find_map(|attr| attr.value.iter().find(|v| &v.id == id).map(|v| (attr, v)))
    }
}

/// Pricing block some listing endpoints nest instead of top-level fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBlock {
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub product_price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub variants: Option<VariantConfig>,
}

/// A product document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<ProductId>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_short_description: Option<String>,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub thumbnail_image: Option<String>,
    #[serde(default)]
    pub product_image: Vec<String>,
    /// Charged price.
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub product_price: Decimal,
    /// Compare-at ("was") price.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub product_discount: Option<Decimal>,
    #[serde(default)]
    pub pricing: Option<PricingBlock>,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub product_sub_category: Option<String>,
    #[serde(default)]
    pub product_brand: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub variants: Option<VariantConfig>,
    #[serde(default, rename = "flash_sale")]
    pub flash_sale: bool,
    #[serde(default, rename = "hot_deal")]
    pub hot_deal: bool,
    #[serde(default, rename = "limited_stock")]
    pub limited_stock: bool,
    #[serde(default, rename = "new_arrival")]
    pub new_arrival: bool,
    #[serde(default, rename = "best_seller")]
    pub best_seller: bool,
}

impl Product {
    /// Product id, preferring the document `_id`.
    #[must_use]
    pub fn id(&self) -> Option<&ProductId> {
        self.mongo_id.as_ref().or(self.product_id.as_ref())
    }

    /// Charged price, falling back to the nested pricing block.
    #[must_use]
    pub fn price(&self) -> Decimal {
        if self.product_price.is_zero()
            && let Some(p) = self.pricing.as_ref().and_then(|p| p.product_price)
        {
            return p;
        }
        self.product_price
    }

    /// Compare-at price if it is positive.
    #[must_use]
    pub fn compare_at(&self) -> Option<Decimal> {
        self.product_discount
            .or_else(|| self.pricing.as_ref().and_then(|p| p.discount_price))
            .filter(|d| d.is_sign_positive() && !d.is_zero())
    }

    /// Variant configuration, from either location.
    #[must_use]
    pub fn variant_config(&self) -> Option<&VariantConfig> {
        self.variants
            .as_ref()
            .or_else(|| self.pricing.as_ref().and_then(|p| p.variants.as_ref()))
    }

    /// True when variants are enabled and at least one attribute exists.
    #[must_use]
    pub fn has_variants(&self) -> bool {
        self.variant_config()
            .is_some_and(|v| v.enabled && !v.attributes.is_empty())
    }

    /// True when some variant attribute must be chosen before adding to cart.
    #[must_use]
    pub fn has_required_variants(&self) -> bool {
        self.has_variants()
            && self
                .variant_config()
                .is_some_and(|v| v.attributes.iter().any(|a| a.required))
    }

    /// Whole-number discount relative to the compare-at price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        self.compare_at()
            .and_then(|compare| discount_percent(self.price(), compare))
    }

    /// Merchandising badge, highest priority first.
    #[must_use]
    pub const fn badge(&self) -> Option<&'static str> {
        if self.flash_sale {
            Some("Flash Sale")
        } else if self.hot_deal {
            Some("Hot Deal")
        } else if self.limited_stock {
            Some("Limited")
        } else if self.new_arrival {
            Some("New")
        } else if self.best_seller {
            Some("Bestseller")
        } else {
            None
        }
    }

    /// Thumbnail followed by gallery images, blanks removed.
    #[must_use]
    pub fn all_images(&self) -> Vec<&str> {
        self.thumbnail_image
            .iter()
            .chain(self.product_image.iter())
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
    }
}

/// Paged product listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    #[serde(default)]
    pub data: Vec<Product>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Product category with its subcategory names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subcategory: Vec<String>,
}

/// Product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
}

/// Shop page sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    Newest,
}

impl SortOrder {
    /// All orders with their labels, for the sort dropdown.
    pub const ALL: [(Self, &'static str, &'static str); 6] = [
        (Self::Default, "default", "Featured"),
        (Self::PriceAsc, "price-asc", "Price: Low to High"),
        (Self::PriceDesc, "price-desc", "Price: High to Low"),
        (Self::NameAsc, "name-asc", "Name: A to Z"),
        (Self::NameDesc, "name-desc", "Name: Z to A"),
        (Self::Newest, "newest", "Newest"),
    ];
}

/// Default upper bound of the price filter.
pub const MAX_PRICE_FILTER: u32 = 10_000;

/// Client-side filters applied to a fetched shop page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopFilter {
    pub category: Option<String>,
    pub subcategories: Vec<String>,
    pub brands: Vec<String>,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub sort: SortOrder,
}

impl Default for ShopFilter {
    fn default() -> Self {
        Self {
            category: None,
            subcategories: Vec::new(),
            brands: Vec::new(),
            min_price: Decimal::ZERO,
            max_price: Decimal::from(MAX_PRICE_FILTER),
            sort: SortOrder::Default,
        }
    }
}

impl ShopFilter {
    /// True if anything deviates from the defaults (sort excluded).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.category.is_some()
            || !self.subcategories.is_empty()
            || !self.brands.is_empty()
            || !self.min_price.is_zero()
            || self.max_price != Decimal::from(MAX_PRICE_FILTER)
    }

    /// Filter and sort `products`.
    ///
    /// Category and brand selections are ids; products carry names, so the
    /// facet lists translate between them. Unknown ids match nothing.
    #[must_use]
    pub fn apply(&self, products: Vec<Product>, categories: &[Category], brands: &[Brand]) -> Vec<Product> {
        let category_name = self.category.as_ref().map(|id| {
            categories
                .iter()
                .find(|c| &c.id == id)
                .map(|c| c.name.clone())
        });
        let brand_names: Vec<&str> = self
            .brands
            .iter()
            .filter_map(|id| brands.iter().find(|b| &b.id == id).map(|b| b.name.as_str()))
            .collect();

        let mut filtered: Vec<Product> = products
            .into_iter()
            .filter(|p| match &category_name {
                None => true,
                Some(None) => false,
                Some(Some(name)) => p.product_category.as_deref() == Some(name.as_str()),
            })
            .filter(|p| {
                self.subcategories.is_empty()
                    || p.product_sub_category
                        .as_ref()
                        .is_some_and(|s| self.subcategories.contains(s))
            })
            .filter(|p| {
                self.brands.is_empty()
                    || p.product_brand
                        .as_deref()
                        .is_some_and(|b| brand_names.contains(&b))
            })
            .filter(|p| {
                let price = p.price();
                price >= self.min_price && price <= self.max_price
            })
            .collect();

        match self.sort {
            SortOrder::Default => {}
            SortOrder::PriceAsc => filtered.sort_by_key(Product::price),
            SortOrder::PriceDesc => filtered.sort_by_key(|p| core::cmp::Reverse(p.price())),
            SortOrder::NameAsc => filtered.sort_by(|a, b| compare_names(a, b)),
            SortOrder::NameDesc => filtered.sort_by(|a, b| compare_names(b, a)),
            SortOrder::Newest => filtered.sort_by(|a, b| b.created().cmp(&a.created())),
        }

        filtered
    }
}

fn compare_names(a: &Product, b: &Product) -> Ordering {
    a.product_name
        .to_lowercase()
        .cmp(&b.product_name.to_lowercase())
}

/// Minimum search term length before the backend is queried.
pub const MIN_SEARCH_LEN: usize = 2;

/// Result cap for the quick-search overlay.
pub const SEARCH_RESULT_LIMIT: u32 = 6;

/// Products per shop page.
pub const SHOP_PAGE_SIZE: u32 = 20;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn product(name: &str, price: i64, category: &str, brand: &str, created: &str) -> Product {
        Product {
            mongo_id: Some(ProductId::new(name)),
            product_name: name.into(),
            product_price: Decimal::from(price),
            product_category: Some(category.into()),
            product_brand: Some(brand.into()),
            created_at: Some(created.into()),
            ..Product::default()
        }
    }

    #[test]
    fn test_decode_mongo_product() {
        let p: Product = serde_json::from_value(json!({
            "_id": "p1",
            "productName": "Mug",
            "productPrice": {"$numberDecimal": "12.00"},
            "productDiscount": {"$numberDecimal": "15.00"},
            "thumbnailImage": "/img/mug.png",
            "variants": {
                "enabled": true,
                "attributes": [{
                    "name": "Color",
                    "required": true,
                    "value": [{"_id": "v1", "name": "Red", "price": {"$numberDecimal": "0"}, "image": []}]
                }]
            }
        }))
        .unwrap();

        assert_eq!(p.id(), Some(&ProductId::new("p1")));
        assert_eq!(p.price(), Decimal::from(12));
        assert_eq!(p.compare_at(), Some(Decimal::from(15)));
        assert_eq!(p.discount_percent(), Some(20));
        assert!(p.has_required_variants());
        assert!(!p.variant_config().unwrap().uses_default_pricing());
        let (attr, option) = p.variant_config().unwrap().find_option(&VariantId::new("v1")).unwrap();
        assert_eq!(attr.name, "Color");
        assert_eq!(option.name, "Red");
    }

    #[test]
    fn test_listing_product_with_pricing_block() {
        let p: Product = serde_json::from_value(json!({
            "productId": "p2",
            "productName": "Cap",
            "pricing": {"productPrice": 8, "discountPrice": 10}
        }))
        .unwrap();
        assert_eq!(p.id(), Some(&ProductId::new("p2")));
        assert_eq!(p.price(), Decimal::from(8));
        assert_eq!(p.compare_at(), Some(Decimal::from(10)));
    }

    #[test]
    fn test_badge_priority() {
        let p = Product {
            new_arrival: true,
            hot_deal: true,
            ..Product::default()
        };
        assert_eq!(p.badge(), Some("Hot Deal"));
    }

    #[test]
    fn test_filter_and_sort() {
        let products = vec![
            product("Banana", 30, "Fruit", "Acme", "2024-01-02T00:00:00Z"),
            product("apple", 10, "Fruit", "Zed", "2024-03-01T00:00:00Z"),
            product("Carrot", 20, "Veg", "Acme", "2024-02-01T00:00:00Z"),
        ];
        let categories = vec![Category {
            id: "c1".into(),
            name: "Fruit".into(),
            subcategory: vec![],
        }];
        let brands = vec![Brand {
            id: "b1".into(),
            name: "Acme".into(),
        }];

        let by_category = ShopFilter {
            category: Some("c1".into()),
            sort: SortOrder::PriceAsc,
            ..ShopFilter::default()
        };
        let out = by_category.apply(products.clone(), &categories, &brands);
        assert_eq!(out.iter().map(|p| p.product_name.as_str()).collect::<Vec<_>>(), ["apple", "Banana"]);
        assert!(by_category.is_active());

        let by_brand = ShopFilter {
            brands: vec!["b1".into()],
            sort: SortOrder::NameDesc,
            ..ShopFilter::default()
        };
        let out = by_brand.apply(products.clone(), &categories, &brands);
        assert_eq!(out.iter().map(|p| p.product_name.as_str()).collect::<Vec<_>>(), ["Carrot", "Banana"]);

        let newest = ShopFilter {
            sort: SortOrder::Newest,
            max_price: Decimal::from(25),
            ..ShopFilter::default()
        };
        let out = newest.apply(products, &categories, &brands);
        assert_eq!(out.iter().map(|p| p.product_name.as_str()).collect::<Vec<_>>(), ["apple", "Carrot"]);
    }

    #[test]
    fn test_unknown_category_matches_nothing() {
        let filter = ShopFilter {
            category: Some("missing".into()),
            ..ShopFilter::default()
        };
        let out = filter.apply(vec![product("A", 1, "Fruit", "Acme", "")], &[], &[]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_sort_order_wire_names() {
        let s: SortOrder = serde_json::from_str("\"price-desc\"").unwrap();
        assert_eq!(s, SortOrder::PriceDesc);
    }
}

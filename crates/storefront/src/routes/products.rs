//! Catalog route handlers: the shop listing, product detail and the
//! product-grid section fragment.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::{instrument, warn};
use url::form_urlencoded;

use shopfront_core::cart::Cart;
use shopfront_core::catalog::{Brand, Category, MAX_PRICE_FILTER, Product, SHOP_PAGE_SIZE, ShopFilter, SortOrder};
use shopfront_core::types::Currency;
use shopfront_core::ProductId;

use crate::backend::ProductQuery;
use crate::error::Result;
use crate::middleware::{CspNonce, StoreScope};
use crate::routes::layout::{Layout, Shop};
use crate::sections::{GridQuery, asset_path};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Product card display data for listings and grids.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub discount_percent: Option<u32>,
    pub badge: Option<&'static str>,
    /// Can be added straight from the card (no required options).
    pub quick_add: bool,
}

impl ProductCardView {
    /// Build a card, or `None` for a product without an id.
    #[must_use]
    pub fn new(product: &Product, currency: &Currency, asset_url: &str) -> Option<Self> {
        let id = product.id()?;
        Some(Self {
            id: id.to_string(),
            name: product.product_name.clone(),
            image: product
                .all_images()
                .first()
                .map(|path| asset_path(asset_url, path)),
            price: currency.format(product.price()),
            compare_at_price: product
                .compare_at()
                .filter(|c| *c > product.price())
                .map(|c| currency.format(c)),
            discount_percent: product.discount_percent(),
            badge: product.badge(),
            quick_add: !product.has_required_variants(),
        })
    }

    /// Cards for every product that has an id.
    #[must_use]
    pub fn list(products: &[Product], currency: &Currency, asset_url: &str) -> Vec<Self> {
        products
            .iter()
            .filter_map(|p| Self::new(p, currency, asset_url))
            .collect()
    }
}

/// One selectable variant option.
#[derive(Debug, Clone)]
pub struct OptionView {
    pub id: String,
    pub name: String,
    pub price: Option<String>,
    pub checked: bool,
}

/// A variant attribute with its options.
#[derive(Debug, Clone)]
pub struct AttributeView {
    pub name: String,
    pub required: bool,
    pub options: Vec<OptionView>,
}

/// Product detail display data.
#[derive(Debug, Clone)]
pub struct ProductDetailView {
    pub card: ProductCardView,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub images: Vec<String>,
    pub attributes: Vec<AttributeView>,
    pub in_cart: bool,
}

impl ProductDetailView {
    /// Build the detail view. The first option of the first required
    /// attribute starts out checked.
    #[must_use]
    pub fn new(product: &Product, card: ProductCardView, currency: &Currency, asset_url: &str, in_cart: bool) -> Self {
        let mut preselected = false;
        let attributes = product
            .variant_config()
            .filter(|_| product.has_variants())
            .map(|config| {
                let own_pricing = !config.uses_default_pricing();
                config
                    .attributes
                    .iter()
                    .map(|attribute| {
                        let check_first = attribute.required && !preselected;
                        preselected |= check_first && !attribute.value.is_empty();
                        AttributeView {
                            name: attribute.name.clone(),
                            required: attribute.required,
                            options: attribute
                                .value
                                .iter()
                                .enumerate()
                                .map(|(i, option)| OptionView {
                                    id: option.id.to_string(),
                                    name: option.name.clone(),
                                    price: option
                                        .price
                                        .filter(|p| own_pricing && *p > Decimal::ZERO)
                                        .map(|p| currency.format(p)),
                                    checked: check_first && i == 0,
                                })
                                .collect(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            card,
            short_description: product.product_short_description.clone(),
            description: product.product_description.clone(),
            category: product.product_category.clone(),
            images: product
                .all_images()
                .into_iter()
                .map(|path| asset_path(asset_url, path))
                .collect(),
            attributes,
            in_cart,
        }
    }
}

/// Filter facet entry.
#[derive(Debug, Clone)]
pub struct FacetView {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

/// Sort dropdown entry.
#[derive(Debug, Clone)]
pub struct SortView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

// =============================================================================
// Queries
// =============================================================================

/// Deserialize empty strings as None for optional decimal fields.
fn empty_string_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Decimal::from_str(s).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Shop listing query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShopQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    /// Comma-separated subcategory names.
    pub subcategories: Option<String>,
    /// Comma-separated brand ids.
    pub brands: Option<String>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub min_price: Option<Decimal>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub max_price: Option<Decimal>,
    pub sort: Option<String>,
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

impl ShopQuery {
    /// Requested page, 1-based.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Search term, if any.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Sort order; unknown values fall back to the default.
    #[must_use]
    pub fn sort_order(&self) -> SortOrder {
        self.sort
            .as_deref()
            .and_then(|value| SortOrder::ALL.iter().find(|(_, v, _)| *v == value))
            .map_or(SortOrder::Default, |(order, _, _)| *order)
    }

    /// Filters to apply to the fetched page.
    #[must_use]
    pub fn filter(&self) -> ShopFilter {
        ShopFilter {
            category: self.category.clone().filter(|c| !c.is_empty()),
            subcategories: split_list(self.subcategories.as_deref()),
            brands: split_list(self.brands.as_deref()),
            min_price: self.min_price.unwrap_or(Decimal::ZERO),
            max_price: self.max_price.unwrap_or_else(|| Decimal::from(MAX_PRICE_FILTER)),
            sort: self.sort_order(),
        }
    }

    /// Query string of everything but the page, ready for a `page=` suffix.
    #[must_use]
    pub fn page_prefix(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let pairs = [
            ("search", self.search().map(str::to_owned)),
            ("category", self.category.clone()),
            ("subcategories", self.subcategories.clone()),
            ("brands", self.brands.clone()),
            ("min_price", self.min_price.map(|p| p.to_string())),
            ("max_price", self.max_price.map(|p| p.to_string())),
            ("sort", self.sort.clone()),
        ];
        for (key, value) in pairs {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                query.append_pair(key, &value);
            }
        }
        let query = query.finish();
        if query.is_empty() { query } else { query + "&" }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Shop listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/shop.html")]
pub struct ShopTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCardView>,
    pub search: String,
    pub categories: Vec<FacetView>,
    pub brands: Vec<FacetView>,
    pub sort_options: Vec<SortView>,
    pub min_price: String,
    pub max_price: String,
    pub filters_active: bool,
    pub current_page: u32,
    pub total_pages: u32,
    pub page_prefix: String,
    pub load_failed: bool,
}

impl ShopTemplate {
    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/product.html")]
pub struct ProductTemplate {
    pub layout: Layout,
    pub product: ProductDetailView,
}

/// Product grid section data (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/product_grid.html")]
pub struct ProductGridTemplate {
    pub grid_class: &'static str,
    pub products: Vec<ProductCardView>,
}

// =============================================================================
// Handlers
// =============================================================================

fn facets(categories: &[Category], brands: &[Brand], filter: &ShopFilter) -> (Vec<FacetView>, Vec<FacetView>) {
    let categories = categories
        .iter()
        .map(|c| FacetView {
            id: c.id.clone(),
            name: c.name.clone(),
            selected: filter.category.as_ref() == Some(&c.id),
        })
        .collect();
    let brands = brands
        .iter()
        .map(|b| FacetView {
            id: b.id.clone(),
            name: b.name.clone(),
            selected: filter.brands.contains(&b.id),
        })
        .collect();
    (categories, brands)
}

/// Display the shop listing.
///
/// One backend page is fetched for the effective country; facet filters and
/// sorting apply to that page.
#[instrument(skip_all, fields(store_id = %scope.store_id, page = query.page()))]
pub async fn index(
    State(state): State<AppState>,
    nonce: CspNonce,
    Query(query): Query<ShopQuery>,
    mut scope: StoreScope,
) -> Result<impl IntoResponse> {
    let shop = Shop::load(&state, &mut scope).await;
    let filter = query.filter();
    let backend = state.backend();

    let (page, categories, brands) = tokio::join!(
        backend.products(ProductQuery {
            store_id: &scope.store_id,
            country_name: shop.country_name(),
            page: query.page(),
            limit: SHOP_PAGE_SIZE,
            search: query.search(),
        }),
        backend.categories(&scope.store_id),
        backend.brands(&scope.store_id),
    );

    let categories = categories.unwrap_or_else(|e| {
        warn!(error = %e, "categories unavailable");
        Default::default()
    });
    let brands = brands.unwrap_or_else(|e| {
        warn!(error = %e, "brands unavailable");
        Default::default()
    });
    let (page, load_failed) = match page {
        Ok(page) => (page, false),
        Err(e) => {
            warn!(error = %e, "product listing unavailable");
            (Default::default(), true)
        }
    };

    let total_pages = page.total_pages.unwrap_or(1).max(1);
    let products = filter.apply(page.data, &categories, &brands);
    let currency = shop.currency();
    let (category_facets, brand_facets) = facets(&categories, &brands, &filter);
    let sort = filter.sort;

    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Shop")).await?;
    scope.save().await?;

    Ok(ShopTemplate {
        layout,
        products: ProductCardView::list(&products, &currency, &state.config().backend.asset_url),
        search: query.search().unwrap_or_default().to_owned(),
        categories: category_facets,
        brands: brand_facets,
        sort_options: SortOrder::ALL
            .iter()
            .map(|&(order, value, label)| SortView {
                value,
                label,
                selected: order == sort,
            })
            .collect(),
        min_price: filter.min_price.to_string(),
        max_price: filter.max_price.to_string(),
        filters_active: filter.is_active(),
        current_page: query.page(),
        total_pages,
        page_prefix: query.page_prefix(),
        load_failed,
    })
}

/// Display a product.
#[instrument(skip_all, fields(store_id = %scope.store_id, product_id = %product_id))]
pub async fn show(
    State(state): State<AppState>,
    nonce: CspNonce,
    Path(product_id): Path<String>,
    mut scope: StoreScope,
) -> Result<impl IntoResponse> {
    let shop = Shop::load(&state, &mut scope).await;
    let product = state.backend().product(&ProductId::new(product_id.as_str())).await?;

    let currency = shop.currency();
    let asset_url = &state.config().backend.asset_url;
    let card = ProductCardView::new(&product, &currency, asset_url)
        .ok_or_else(|| crate::error::AppError::NotFound(format!("product {product_id}")))?;

    // Any line of this product, with or without a variant.
    let in_cart = Cart::load(&mut scope.storage)
        .items()
        .iter()
        .any(|item| item.product_id.as_str() == card.id);
    let detail = ProductDetailView::new(&product, card, &currency, asset_url, in_cart);

    let layout = Layout::load(&state, &scope, &shop, nonce, Some(product.product_name.as_str())).await?;
    scope.save().await?;

    Ok(ProductTemplate { layout, product: detail })
}

/// Product grid section data (HTMX).
///
/// Manual grids fetch their products by id; the rest show the newest page of
/// the store's catalog for the visitor's country. Failures render an empty
/// grid.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn grid_fragment(
    State(state): State<AppState>,
    Query(query): Query<GridQuery>,
    mut scope: StoreScope,
) -> Result<impl IntoResponse> {
    let shop = Shop::load(&state, &mut scope).await;
    let ids: Vec<ProductId> = query.manual_ids().into_iter().map(ProductId::new).collect();
    let limit = query.limit();

    let products = if ids.is_empty() {
        state
            .backend()
            .products(ProductQuery {
                store_id: &scope.store_id,
                country_name: shop.country_name(),
                page: 1,
                limit,
                search: None,
            })
            .await
            .map(|page| page.data)
    } else {
        state.backend().product_batch(&ids, limit, shop.country_name()).await
    };
    let mut products = products.unwrap_or_else(|e| {
        warn!(error = %e, "product grid data unavailable");
        Vec::new()
    });
    products.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    scope.save().await?;

    Ok(ProductGridTemplate {
        grid_class: query.grid_class(),
        products: ProductCardView::list(&products, &shop.currency(), &state.config().backend.asset_url),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn product(value: serde_json::Value) -> Product {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_card_view() {
        let p = product(json!({
            "_id": "p1",
            "productName": "Mug",
            "productPrice": 8,
            "productDiscount": 10,
            "thumbnailImage": "uploads/mug.png",
            "new_arrival": true
        }));
        let card = ProductCardView::new(&p, &Currency::default(), "https://cdn.test/").unwrap();
        assert_eq!(card.price, "$8.00");
        assert_eq!(card.compare_at_price.as_deref(), Some("$10.00"));
        assert_eq!(card.discount_percent, Some(20));
        assert_eq!(card.badge, Some("New"));
        assert_eq!(card.image.as_deref(), Some("https://cdn.test/uploads/mug.png"));
        assert!(card.quick_add);
    }

    #[test]
    fn test_card_skips_products_without_id() {
        let list = ProductCardView::list(&[Product::default()], &Currency::default(), "");
        assert!(list.is_empty());
    }

    #[test]
    fn test_detail_preselects_first_required_option() {
        let p = product(json!({
            "_id": "p1",
            "productName": "Tee",
            "productPrice": 10,
            "variants": {
                "enabled": true,
                "useDefaultPricing": false,
                "attributes": [
                    {"name": "Color", "required": false, "value": [{"_id": "c1", "name": "Red"}]},
                    {"name": "Size", "required": true, "value": [
                        {"_id": "s1", "name": "S", "price": 12},
                        {"_id": "s2", "name": "M"}
                    ]}
                ]
            }
        }));
        let card = ProductCardView::new(&p, &Currency::default(), "").unwrap();
        assert!(!card.quick_add);

        let detail = ProductDetailView::new(&p, card, &Currency::default(), "", false);
        assert_eq!(detail.attributes.len(), 2);
        assert!(!detail.attributes[0].options[0].checked);
        assert!(detail.attributes[1].options[0].checked);
        assert!(!detail.attributes[1].options[1].checked);
        assert_eq!(detail.attributes[1].options[0].price.as_deref(), Some("$12.00"));
        assert!(detail.attributes[1].options[1].price.is_none());
    }

    #[test]
    fn test_shop_query_filter_and_paging() {
        let query: ShopQuery = serde_json::from_value(json!({
            "page": 3,
            "search": "  mug ",
            "brands": "b1, b2,",
            "min_price": "5",
            "max_price": "",
            "sort": "price-desc"
        }))
        .unwrap();
        assert_eq!(query.page(), 3);
        assert_eq!(query.search(), Some("mug"));

        let filter = query.filter();
        assert_eq!(filter.brands, vec!["b1".to_owned(), "b2".to_owned()]);
        assert_eq!(filter.min_price, Decimal::from(5));
        assert_eq!(filter.max_price, Decimal::from(MAX_PRICE_FILTER));
        assert_eq!(filter.sort, SortOrder::PriceDesc);
        assert!(filter.is_active());

        let prefix = query.page_prefix();
        assert!(prefix.starts_with("search=mug&brands="));
        assert!(prefix.ends_with("sort=price-desc&"));
    }

    #[test]
    fn test_shop_query_defaults() {
        let query = ShopQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.sort_order(), SortOrder::Default);
        assert!(!query.filter().is_active());
        assert_eq!(query.page_prefix(), "");

        let unknown = ShopQuery {
            sort: Some("cheapest".into()),
            ..ShopQuery::default()
        };
        assert_eq!(unknown.sort_order(), SortOrder::Default);
    }
}

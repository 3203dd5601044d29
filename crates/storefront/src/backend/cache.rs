//! Cache types for store-level backend responses.

use std::sync::Arc;

use shopfront_core::StoreId;
use shopfront_core::catalog::{Brand, Category};
use shopfront_core::checkout::BankDetails;
use shopfront_core::content::StoreMeta;
use shopfront_core::country::StorePreference;
use shopfront_core::section::PageSections;

use super::types::{CountryReference, StripeStatus};

/// Cache key for per-store responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Theme(StoreId),
    Preference(StoreId),
    Meta(StoreId),
    Categories(StoreId),
    Brands(StoreId),
    Bank(StoreId),
    Stripe(StoreId),
    Countries,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Theme(Arc<PageSections>),
    Preference(Arc<StorePreference>),
    Meta(Arc<StoreMeta>),
    Categories(Arc<Vec<Category>>),
    Brands(Arc<Vec<Brand>>),
    Bank(Option<Arc<BankDetails>>),
    Stripe(StripeStatus),
    Countries(Arc<Vec<CountryReference>>),
}

//! Shopfront Core - storefront domain logic.
//!
//! Everything the storefront decides without talking to the network lives
//! here:
//! - [`cart`] - cart lines, pricing policy, totals, order projections
//! - [`section`] - server-described layouts and the renderer registry
//! - [`store`] - request host to store id resolution with caching
//! - [`country`] - per-store country and currency selection
//! - [`checkout`] - shipping validation, payment methods, order payloads
//!
//! # Architecture
//!
//! State that would live in the browser (cart, chosen country, sign-in,
//! resolved store) goes through the [`storage::ClientStorage`] trait. The
//! server crate backs it with the visitor's session; tests use
//! [`storage::MemoryStorage`]. Network lookups enter through traits such as
//! [`store::StoreDirectory`] so this crate stays free of HTTP clients.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod country;
pub mod form;
pub mod order;
pub mod section;
pub mod storage;
pub mod store;
pub mod types;

pub use types::*;

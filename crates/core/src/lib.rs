//! Thriftr Core - Shared types library.
//!
//! This crate provides common types used across all Thriftr components:
//! - `client` - The mobile storefront client core (cart, wishlist, catalog)
//! - `integration-tests` - Cross-crate scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no timers. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, products, cart line items, orders,
//!   profiles, and load-state unions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

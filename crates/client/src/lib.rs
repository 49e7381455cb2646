//! Thriftr client core library.
//!
//! The storefront client for a hosted backend-as-a-service: optimistic cart
//! and wishlist state machines, debounced remote sync, paginated catalog
//! browsing, orders, and profile management. No rendering or navigation
//! lives here - this crate is the layer a UI binds to.
//!
//! # Architecture
//!
//! - [`backend`] - collaborator contracts (document store, file store, auth)
//!   plus the Appwrite REST implementation and an in-memory test backend
//! - [`repository`] - per-collection document orchestration
//! - [`cart`] - optimistic cart ledger and debounced remote sync
//! - [`wishlist`] - soft-delete-with-undo wishlist
//! - [`catalog`] - paginated, cached product browsing with view-side
//!   sort/filter
//! - [`auth`] - session lifecycle over the backend auth provider
//! - [`state`] - explicit dependency wiring (no global client singleton)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod backend;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod repository;
pub mod state;
pub mod wishlist;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use state::{App, Session};

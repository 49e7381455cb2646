//! Core types for Thriftr.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod state;
pub mod user;

pub use cart::{CartItem, CartLine, LineItemKey};
pub use id::*;
pub use order::{Order, OrderItem, OrderStatus, OrderSummary};
pub use price::Price;
pub use product::{DecodeError, Product};
pub use state::LoadState;
pub use user::{Address, UserProfile};

//! Unified error handling for the client core.
//!
//! Mutation entry points return `Result<T, AppError>`. Background sync
//! failures are deliberately NOT part of these results - they surface on the
//! cart/wishlist event channels instead, so optimistic UI never blocks on
//! the network.

use thiserror::Error;

use thriftr_core::{DecodeError, ProductId};

use crate::backend::BackendError;

/// Application-level error type for the client core.
#[derive(Debug, Error)]
pub enum AppError {
    /// A quantity-set mutation referenced a product with no resolvable
    /// metadata.
    #[error("product not found: {0}")]
    ProductUnresolved(ProductId),

    /// A read from the document store failed.
    #[error("remote read failed: {0}")]
    RemoteRead(#[source] BackendError),

    /// A write to the document store failed.
    #[error("remote write failed: {0}")]
    RemoteWrite(#[source] BackendError),

    /// Undo was invoked outside its valid window.
    #[error("no pending removal to undo for {0}")]
    NotPending(String),

    /// A stored document did not match its schema.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The operation requires a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// Checkout was attempted with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

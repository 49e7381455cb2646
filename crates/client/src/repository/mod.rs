//! Per-user data access over the document and file stores.
//!
//! Each repository is scoped to one authenticated user at construction and
//! owns the wire-format details of its collection. Services above this
//! layer deal only in domain types.

pub mod cart;
pub mod orders;
pub mod products;
pub mod profile;
pub mod wishlist;

pub use cart::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use profile::ProfileRepository;
pub use wishlist::WishlistRepository;

use crate::backend::BackendError;
use crate::error::AppError;

/// Map a backend failure on a read path.
pub(crate) fn read_err(error: BackendError) -> AppError {
    AppError::RemoteRead(error)
}

/// Map a backend failure on a write path.
pub(crate) fn write_err(error: BackendError) -> AppError {
    AppError::RemoteWrite(error)
}

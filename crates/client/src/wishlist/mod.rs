//! Wishlist orchestration: optimistic removal with a 4-second undo.
//!
//! Saves write through to the remote document immediately; removals hide
//! the product locally and stage the remote delete behind the undo window
//! so a mistap can be taken back.

pub mod soft_delete;

pub use soft_delete::{SoftDelete, TombstoneDeleter, UndoEvent};

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use thriftr_core::{Product, ProductId};

use crate::backend::DocumentStore;
use crate::error::Result;
use crate::repository::WishlistRepository;

impl<B: DocumentStore> TombstoneDeleter<ProductId> for WishlistRepository<B> {
    async fn delete(&self, key: ProductId) -> Result<()> {
        self.remove(&key).await
    }
}

/// Events the wishlist surfaces to its owner.
pub type WishlistEvent = UndoEvent<ProductId, Product>;

/// The wishlist facade for one session.
pub struct WishlistService<B> {
    repo: Arc<WishlistRepository<B>>,
    items: Vec<Product>,
    soft_delete: SoftDelete<ProductId, Product, WishlistRepository<B>>,
}

impl<B: DocumentStore> WishlistService<B> {
    /// Build the service and the receiving end of its event channel.
    #[must_use]
    pub fn new(
        repo: Arc<WishlistRepository<B>>,
    ) -> (Self, mpsc::UnboundedReceiver<WishlistEvent>) {
        let (soft_delete, events) = SoftDelete::new(Arc::clone(&repo));
        (
            Self {
                repo,
                items: Vec::new(),
                soft_delete,
            },
            events,
        )
    }

    /// Reload saved products from the remote document.
    ///
    /// Products with a staged deletion stay hidden even though the remote
    /// still carries them until their window fires.
    #[instrument(skip(self), level = "debug")]
    pub async fn refresh(&mut self) -> Result<()> {
        let fetched = self.repo.fetch().await?;
        self.items = fetched
            .into_iter()
            .filter(|p| !self.soft_delete.is_pending(&p.id))
            .collect();
        Ok(())
    }

    /// Save a product. Saving one whose removal is still undoable counts
    /// as an undo.
    #[instrument(skip(self, product), fields(product = %product.id), level = "debug")]
    pub async fn add(&mut self, product: Product) -> Result<()> {
        if self.soft_delete.is_pending(&product.id) {
            return self.undo(&product.id.clone());
        }
        if self.contains(&product.id) {
            return Ok(());
        }
        self.repo.add(&product).await?;
        self.items.push(product);
        Ok(())
    }

    /// Hide a product and stage its remote delete behind the undo window.
    #[instrument(skip(self), level = "debug")]
    pub fn remove(&mut self, product_id: &ProductId) {
        let Some(index) = self.items.iter().position(|p| &p.id == product_id) else {
            return;
        };
        let product = self.items.remove(index);
        self.soft_delete.stage(product_id.clone(), product, index);
    }

    /// Take back a removal, restoring the product at its old position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AppError::NotPending`] once the window has
    /// fired.
    #[instrument(skip(self), level = "debug")]
    pub fn undo(&mut self, product_id: &ProductId) -> Result<()> {
        let (product, index) = self.soft_delete.undo(product_id)?;
        let index = index.min(self.items.len());
        self.items.insert(index, product);
        Ok(())
    }

    /// Fold one fired-deletion outcome back into local state.
    pub fn apply_event(&mut self, event: WishlistEvent) {
        match event {
            UndoEvent::Deleted { key } => {
                debug!(product = %key, "wishlist removal confirmed");
            }
            UndoEvent::DeleteFailed {
                key,
                value,
                index,
                error,
            } => {
                warn!(product = %key, %error, "wishlist delete failed; restoring");
                let index = index.min(self.items.len());
                self.items.insert(index, value);
            }
        }
    }

    /// The saved products the UI renders.
    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    /// Whether the product is currently visible in the wishlist.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|p| &p.id == product_id)
    }

    /// Empty the wishlist outright, with no undo window.
    ///
    /// Staged deletes are abandoned (the document delete below covers
    /// them) and the remote document is removed immediately.
    #[instrument(skip(self), level = "debug")]
    pub async fn clear(&mut self) -> Result<()> {
        self.soft_delete.clear_all();
        self.items.clear();
        self.repo.clear().await
    }

    /// Drop local state and abandon staged deletes (logout). Remote
    /// documents are kept.
    pub fn shutdown(&mut self) {
        self.soft_delete.clear_all();
        self.items.clear();
    }
}

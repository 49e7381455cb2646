//! Cart orchestration: optimistic local state plus debounced remote sync.
//!
//! Mutations update the [`CartLedger`] synchronously and hand the final
//! per-key state to [`DebouncedSync`], which coalesces bursts into single
//! writes. Write outcomes come back on the event channel and are folded
//! into the ledger via [`CartService::apply_event`].

pub mod ledger;
pub mod sync;

pub use ledger::CartLedger;
pub use sync::{CartSyncer, DebouncedSync, SyncEvent};

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{instrument, warn};

use thriftr_core::{CartItem, CartLine, OrderSummary, ProductId};

use crate::backend::{BackendError, DocumentStore, FileStore};
use crate::error::{AppError, Result};
use crate::repository::{CartRepository, ProductRepository};

/// The cart facade for one session.
pub struct CartService<B> {
    repo: Arc<CartRepository<B>>,
    products: Arc<ProductRepository<B>>,
    ledger: CartLedger,
    sync: DebouncedSync<CartRepository<B>>,
}

impl<B: DocumentStore + FileStore> CartService<B> {
    /// Build the service and the receiving end of its sync event channel.
    ///
    /// The caller owns the receiver and is expected to drain it into
    /// [`CartService::apply_event`].
    #[must_use]
    pub fn new(
        repo: Arc<CartRepository<B>>,
        products: Arc<ProductRepository<B>>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (sync, events) = DebouncedSync::new(Arc::clone(&repo));
        (
            Self {
                repo,
                products,
                ledger: CartLedger::new(),
                sync,
            },
            events,
        )
    }

    /// Reload the confirmed cart from the remote document.
    #[instrument(skip(self), level = "debug")]
    pub async fn refresh(&mut self) -> Result<()> {
        let items = self.repo.fetch().await?;
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = self.products.get(&item.product_id).await?;
            lines.push(CartLine {
                product,
                quantity: item.quantity,
                selected_size: item.selected_size,
                selected_color: item.selected_color,
            });
        }
        self.ledger.set_confirmed(lines);
        Ok(())
    }

    /// Set a line's quantity. Values at or below zero remove the line.
    ///
    /// The ledger mutates before any network activity; the remote write is
    /// scheduled behind the quiet period, except removals which go out
    /// immediately.
    #[instrument(skip(self), level = "debug")]
    pub async fn set_quantity(
        &mut self,
        product_id: &ProductId,
        size: Option<&str>,
        color: Option<&str>,
        quantity: i64,
    ) -> Result<()> {
        let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);

        // Only a brand-new line needs the product resolved up front.
        let resolved = if quantity > 0
            && !self.ledger.contains(product_id, size, color)
        {
            match self.products.get(product_id).await {
                Ok(product) => Some(product),
                Err(AppError::RemoteRead(BackendError::NotFound(_))) => {
                    return Err(AppError::ProductUnresolved(product_id.clone()));
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        self.ledger
            .set_quantity(product_id, size, color, quantity, resolved.as_ref())?;

        let item = CartItem {
            product_id: product_id.clone(),
            quantity,
            selected_size: size.map(str::to_string),
            selected_color: color.map(str::to_string),
        };
        if quantity == 0 {
            self.sync.schedule_immediate(item);
        } else {
            self.sync.schedule(item);
        }
        Ok(())
    }

    /// Remove a line outright.
    pub async fn remove(
        &mut self,
        product_id: &ProductId,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Result<()> {
        self.set_quantity(product_id, size, color, 0).await
    }

    /// Fold one sync outcome back into the ledger.
    pub fn apply_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Confirmed { key, quantity } => {
                self.ledger.apply_confirmed(&key, quantity);
            }
            SyncEvent::WriteFailed { key, error } => {
                warn!(%key, %error, "cart write failed; keeping local state");
            }
        }
    }

    /// The merged cart the UI renders.
    #[must_use]
    pub fn items(&self) -> Vec<CartLine> {
        self.ledger.effective_items()
    }

    /// Whether the product variant is currently in the cart.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId, size: Option<&str>, color: Option<&str>) -> bool {
        self.ledger.contains(product_id, size, color)
    }

    /// Exact sum of line totals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.ledger.total_amount()
    }

    /// Checkout cost breakdown for the current cart.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::calculate(&self.items())
    }

    /// Drop local state and delete the remote document (post-checkout or
    /// explicit clear). Timers still in their quiet period are cancelled
    /// first so a stale write cannot recreate the document.
    #[instrument(skip(self), level = "debug")]
    pub async fn clear(&mut self) -> Result<()> {
        self.sync.cancel_all();
        self.repo.clear().await?;
        self.ledger.clear();
        Ok(())
    }

    /// Cancel pending timers without touching remote state (logout).
    pub fn shutdown(&mut self) {
        self.sync.cancel_all();
        self.ledger.clear();
    }
}

//! Remote cart document access.
//!
//! The remote cart is one document per user: a `userId` attribute plus a
//! `products` array in which every element is a JSON-encoded string holding
//! one line item. That stringly representation is the deployed column shape
//! and is preserved here; decoding is strict, so a malformed element fails
//! the whole read instead of silently dropping the line.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, instrument};
use uuid::Uuid;

use thriftr_core::{CartItem, DecodeError, UserId};

use crate::backend::{BackendError, Document, DocumentStore, Query};
use crate::cart::sync::CartSyncer;
use crate::error::{AppError, Result};
use crate::repository::{read_err, write_err};

/// Reads and writes one user's remote cart document.
pub struct CartRepository<B> {
    backend: Arc<B>,
    collection: String,
    user: UserId,
}

impl<B: DocumentStore> CartRepository<B> {
    /// Scope a repository to one user's cart.
    #[must_use]
    pub fn new(backend: Arc<B>, collection: impl Into<String>, user: UserId) -> Self {
        Self {
            backend,
            collection: collection.into(),
            user,
        }
    }

    /// Fetch the user's cart lines. A missing document is an empty cart.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self) -> Result<Vec<CartItem>> {
        match self.find_document().await? {
            Some(doc) => decode_items(&doc),
            None => Ok(Vec::new()),
        }
    }

    /// Write one line's final state into the document.
    ///
    /// Quantity 0 removes the line. The document is created on the first
    /// line and deleted when the last line goes.
    #[instrument(skip(self), level = "debug")]
    pub async fn apply_item(&self, item: CartItem) -> Result<()> {
        let existing = self.find_document().await?;
        let mut items = match &existing {
            Some(doc) => decode_items(doc)?,
            None => Vec::new(),
        };

        let key = item.key();
        items.retain(|i| i.key() != key);
        if item.quantity > 0 {
            items.push(item);
        }

        match (existing, items.is_empty()) {
            (Some(doc), true) => {
                debug!(document = %doc.id, "cart emptied, deleting document");
                self.backend
                    .delete_document(&self.collection, &doc.id)
                    .await
                    .map_err(write_err)
            }
            (Some(doc), false) => {
                self.backend
                    .update_document(&self.collection, &doc.id, self.encode(&items)?)
                    .await
                    .map(drop)
                    .map_err(write_err)
            }
            (None, true) => Ok(()),
            (None, false) => {
                let id = Uuid::new_v4().to_string();
                self.backend
                    .create_document(&self.collection, &id, self.encode(&items)?)
                    .await
                    .map(drop)
                    .map_err(write_err)
            }
        }
    }

    /// Delete the whole document, emptying the cart (post-checkout).
    #[instrument(skip(self), level = "debug")]
    pub async fn clear(&self) -> Result<()> {
        if let Some(doc) = self.find_document().await? {
            self.backend
                .delete_document(&self.collection, &doc.id)
                .await
                .map_err(write_err)?;
        }
        Ok(())
    }

    async fn find_document(&self) -> Result<Option<Document>> {
        let docs = self
            .backend
            .list_documents(
                &self.collection,
                &[
                    Query::equal("userId", self.user.as_str()),
                    Query::Limit(1),
                ],
            )
            .await
            .map_err(read_err)?;
        Ok(docs.into_iter().next())
    }

    fn encode(&self, items: &[CartItem]) -> Result<Value> {
        let encoded: Vec<String> = items
            .iter()
            .map(|item| serde_json::to_string(item).map_err(BackendError::Parse))
            .collect::<std::result::Result<_, _>>()
            .map_err(write_err)?;
        Ok(json!({
            "userId": self.user.as_str(),
            "products": encoded,
        }))
    }
}

/// Decode the `products` array of JSON-string elements.
fn decode_items(doc: &Document) -> Result<Vec<CartItem>> {
    let elements = doc
        .data
        .get("products")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    elements
        .iter()
        .map(|element| {
            // Elements must be strings; a bare object is also malformed.
            let text: String = serde_json::from_value(element.clone()).map_err(|source| {
                AppError::Decode(DecodeError::Embedded {
                    id: doc.id.clone(),
                    source,
                })
            })?;
            serde_json::from_str::<CartItem>(&text).map_err(|source| {
                AppError::Decode(DecodeError::Embedded {
                    id: doc.id.clone(),
                    source,
                })
            })
        })
        .collect()
}

impl<B: DocumentStore> CartSyncer for CartRepository<B> {
    async fn apply(&self, item: CartItem) -> Result<()> {
        self.apply_item(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    fn repo(backend: &Arc<MemoryBackend>) -> CartRepository<MemoryBackend> {
        CartRepository::new(Arc::clone(backend), "carts", UserId::new("u1"))
    }

    fn item(product: &str, quantity: u32) -> CartItem {
        CartItem {
            product_id: product.into(),
            quantity,
            selected_size: Some("M".to_string()),
            selected_color: None,
        }
    }

    #[tokio::test]
    async fn test_first_line_creates_document_last_line_deletes_it() {
        let backend = Arc::new(MemoryBackend::new());
        let repo = repo(&backend);

        repo.apply_item(item("p1", 2)).await.expect("apply");
        assert_eq!(backend.document_count("carts"), 1);
        assert_eq!(repo.fetch().await.expect("fetch").len(), 1);

        repo.apply_item(item("p1", 0)).await.expect("remove");
        assert_eq!(backend.document_count("carts"), 0);
        assert!(repo.fetch().await.expect("fetch").is_empty());
    }

    #[tokio::test]
    async fn test_apply_replaces_matching_key_only() {
        let backend = Arc::new(MemoryBackend::new());
        let repo = repo(&backend);

        repo.apply_item(item("p1", 2)).await.expect("apply");
        repo.apply_item(item("p2", 1)).await.expect("apply");
        repo.apply_item(item("p1", 7)).await.expect("apply");

        let items = repo.fetch().await.expect("fetch");
        assert_eq!(items.len(), 2);
        let p1 = items
            .iter()
            .find(|i| i.product_id.as_str() == "p1")
            .expect("p1");
        assert_eq!(p1.quantity, 7);
    }

    #[tokio::test]
    async fn test_malformed_element_fails_the_read() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(
            "carts",
            "c1",
            json!({ "userId": "u1", "products": ["not json"] }),
        );
        let repo = repo(&backend);

        let err = repo.fetch().await.expect_err("must fail");
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_missing_document_is_empty_cart() {
        let backend = Arc::new(MemoryBackend::new());
        let repo = repo(&backend);
        assert!(repo.fetch().await.expect("fetch").is_empty());
    }
}

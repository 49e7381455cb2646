//! Remote wishlist document access.
//!
//! Same column shape as the cart: one document per user with a `products`
//! array of JSON-encoded strings, here each holding a full product
//! snapshot. Decoding is strict.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, instrument};
use uuid::Uuid;

use thriftr_core::{DecodeError, Product, ProductId, UserId};

use crate::backend::{BackendError, Document, DocumentStore, Query};
use crate::error::{AppError, Result};
use crate::repository::{read_err, write_err};

/// Reads and writes one user's remote wishlist document.
pub struct WishlistRepository<B> {
    backend: Arc<B>,
    collection: String,
    user: UserId,
}

impl<B: DocumentStore> WishlistRepository<B> {
    /// Scope a repository to one user's wishlist.
    #[must_use]
    pub fn new(backend: Arc<B>, collection: impl Into<String>, user: UserId) -> Self {
        Self {
            backend,
            collection: collection.into(),
            user,
        }
    }

    /// Fetch the saved products. A missing document is an empty wishlist.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self) -> Result<Vec<Product>> {
        match self.find_document().await? {
            Some(doc) => decode_products(&doc),
            None => Ok(Vec::new()),
        }
    }

    /// Append a product if it is not already saved.
    #[instrument(skip(self, product), fields(product = %product.id), level = "debug")]
    pub async fn add(&self, product: &Product) -> Result<()> {
        let existing = self.find_document().await?;
        let mut products = match &existing {
            Some(doc) => decode_products(doc)?,
            None => Vec::new(),
        };

        if products.iter().any(|p| p.id == product.id) {
            return Ok(());
        }
        products.push(product.clone());
        self.store(existing, &products).await
    }

    /// Remove a product. Removing the last one deletes the document.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove(&self, product_id: &ProductId) -> Result<()> {
        let Some(doc) = self.find_document().await? else {
            return Ok(());
        };
        let mut products = decode_products(&doc)?;
        let before = products.len();
        products.retain(|p| &p.id != product_id);
        if products.len() == before {
            return Ok(());
        }

        if products.is_empty() {
            debug!(document = %doc.id, "wishlist emptied, deleting document");
            self.backend
                .delete_document(&self.collection, &doc.id)
                .await
                .map_err(write_err)
        } else {
            self.store(Some(doc), &products).await
        }
    }

    /// Delete the whole document (bulk clear).
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

    async fn store(&self, existing: Option<Document>, products: &[Product]) -> Result<()> {
        let body = self.encode(products)?;
        match existing {
            Some(doc) => self
                .backend
                .update_document(&self.collection, &doc.id, body)
                .await
                .map(drop)
                .map_err(write_err),
            None => {
                let id = Uuid::new_v4().to_string();
                self.backend
                    .create_document(&self.collection, &id, body)
                    .await
                    .map(drop)
                    .map_err(write_err)
            }
        }
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

    fn encode(&self, products: &[Product]) -> Result<Value> {
        let encoded: Vec<String> = products
            .iter()
            .map(|p| serde_json::to_string(p).map_err(BackendError::Parse))
            .collect::<std::result::Result<_, _>>()
            .map_err(write_err)?;
        Ok(json!({
            "userId": self.user.as_str(),
            "products": encoded,
        }))
    }
}

fn decode_products(doc: &Document) -> Result<Vec<Product>> {
    let elements = doc
        .data
        .get("products")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    elements
        .iter()
        .map(|element| {
            let text: String = serde_json::from_value(element.clone()).map_err(|source| {
                AppError::Decode(DecodeError::Embedded {
                    id: doc.id.clone(),
                    source,
                })
            })?;
            serde_json::from_str::<Product>(&text).map_err(|source| {
                AppError::Decode(DecodeError::Embedded {
                    id: doc.id.clone(),
                    source,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use thriftr_core::Price;

    fn repo(backend: &Arc<MemoryBackend>) -> WishlistRepository<MemoryBackend> {
        WishlistRepository::new(Arc::clone(backend), "wishlists", UserId::new("u1"))
    }

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("product {id}"),
            category: "Books".to_string(),
            price: Price::from_minor_units(999),
            free_shipping: false,
            stock: 1,
            discount: None,
            description: None,
            details: None,
            colors: vec![],
            sizes: vec![],
            images: vec![],
        }
    }

    #[tokio::test]
    async fn test_add_is_idempotent_per_product() {
        let backend = Arc::new(MemoryBackend::new());
        let repo = repo(&backend);

        repo.add(&product("p1")).await.expect("add");
        repo.add(&product("p1")).await.expect("add again");
        repo.add(&product("p2")).await.expect("add");

        assert_eq!(repo.fetch().await.expect("fetch").len(), 2);
    }

    #[tokio::test]
    async fn test_remove_last_product_deletes_document() {
        let backend = Arc::new(MemoryBackend::new());
        let repo = repo(&backend);

        repo.add(&product("p1")).await.expect("add");
        assert_eq!(backend.document_count("wishlists"), 1);

        repo.remove(&ProductId::new("p1")).await.expect("remove");
        assert_eq!(backend.document_count("wishlists"), 0);
    }

    #[tokio::test]
    async fn test_remove_absent_product_is_noop() {
        let backend = Arc::new(MemoryBackend::new());
        let repo = repo(&backend);
        repo.remove(&ProductId::new("ghost")).await.expect("noop");
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_through_string_column() {
        let backend = Arc::new(MemoryBackend::new());
        let repo = repo(&backend);

        let mut p = product("p1");
        p.sizes = vec!["S".to_string(), "M".to_string()];
        repo.add(&p).await.expect("add");

        let fetched = repo.fetch().await.expect("fetch");
        assert_eq!(fetched, vec![p]);
    }
}

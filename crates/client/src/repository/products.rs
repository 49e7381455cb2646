//! Product catalog access.
//!
//! Listings are paged server-side; individual lookups go through a small
//! in-process cache so cart and wishlist flows can resolve product
//! snapshots without refetching on every tap.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use thriftr_core::{Price, Product, ProductId};

use crate::backend::{DocumentStore, FileStore, Query};
use crate::error::Result;
use crate::repository::{read_err, write_err};

/// Synthetic category that marks discounted products; excluded from the
/// default listing and surfaced by its own section.
pub const BEST_DEALS_CATEGORY: &str = "Best Deals";

const CACHE_CAPACITY: u64 = 512;
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Attributes for a product being entered into the catalog.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Price,
    pub free_shipping: bool,
    pub stock: u32,
    pub discount: Option<Price>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
}

/// Reads the product collection and writes new entries.
pub struct ProductRepository<B> {
    backend: Arc<B>,
    collection: String,
    image_bucket: String,
    cache: Cache<ProductId, Product>,
}

impl<B: DocumentStore + FileStore> ProductRepository<B> {
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        collection: impl Into<String>,
        image_bucket: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            collection: collection.into(),
            image_bucket: image_bucket.into(),
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// One page of the catalog.
    ///
    /// `category` of `None` is the home listing: every category except
    /// [`BEST_DEALS_CATEGORY`], which has its own section.
    #[instrument(skip(self), level = "debug")]
    pub async fn page(
        &self,
        category: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Product>> {
        let filter = match category {
            Some(name) => Query::equal("category", name),
            None => Query::not_equal("category", BEST_DEALS_CATEGORY),
        };
        self.list(&[filter, Query::Limit(limit), Query::Offset(offset)])
            .await
    }

    /// The discounted-products section.
    #[instrument(skip(self), level = "debug")]
    pub async fn best_deals(&self, limit: u32) -> Result<Vec<Product>> {
        self.list(&[
            Query::equal("category", BEST_DEALS_CATEGORY),
            Query::Limit(limit),
        ])
        .await
    }

    /// Free-text search across name and category.
    #[instrument(skip(self), level = "debug")]
    pub async fn search(&self, term: &str) -> Result<Vec<Product>> {
        self.list(&[Query::any_of(vec![
            Query::search("name", term),
            Query::search("category", term),
        ])])
        .await
    }

    /// Resolve one product, preferring the cache.
    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, id: &ProductId) -> Result<Product> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit);
        }
        let doc = self
            .backend
            .get_document(&self.collection, id.as_str())
            .await
            .map_err(read_err)?;
        let product = Product::from_document(id, &doc.data)?;
        self.cache.insert(id.clone(), product.clone());
        Ok(product)
    }

    /// Enter a new product, uploading its images first.
    ///
    /// `images` are `(bytes, filename, mime type)` triples; their view URLs
    /// land in the document in upload order.
    #[instrument(skip(self, images), level = "debug")]
    pub async fn add(&self, new: NewProduct, images: Vec<(Vec<u8>, String, String)>) -> Result<Product> {
        let mut urls = Vec::with_capacity(images.len());
        for (bytes, filename, mime_type) in images {
            let stored = self
                .backend
                .upload(&self.image_bucket, bytes, &filename, &mime_type)
                .await
                .map_err(write_err)?;
            urls.push(self.backend.view_url(&self.image_bucket, &stored.id));
        }

        let id = ProductId::new(Uuid::new_v4().to_string());
        let body = json!({
            "name": new.name,
            "category": new.category,
            "price": new.price,
            "freeShipping": new.free_shipping,
            "stock": new.stock,
            "discount": new.discount,
            "description": new.description,
            "details": new.details,
            "colors": new.colors,
            "sizes": new.sizes,
            "images": urls,
        });

        let doc = self
            .backend
            .create_document(&self.collection, id.as_str(), body)
            .await
            .map_err(write_err)?;

        let product = Product::from_document(&id, &doc.data)?;
        self.cache.insert(id, product.clone());
        Ok(product)
    }

    async fn list(&self, queries: &[Query]) -> Result<Vec<Product>> {
        let docs = self
            .backend
            .list_documents(&self.collection, queries)
            .await
            .map_err(read_err)?;

        let mut products = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = ProductId::new(doc.id);
            let product = Product::from_document(&id, &doc.data)?;
            self.cache.insert(id, product.clone());
            products.push(product);
        }
        Ok(products)
    }
}

/// Test helper: seedable wire body for a product document.
#[cfg(test)]
pub(crate) fn product_body(name: &str, category: &str, price: f64) -> serde_json::Value {
    json!({
        "name": name,
        "category": category,
        "price": price,
        "sizes": ["M"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn repo(backend: &Arc<MemoryBackend>) -> ProductRepository<MemoryBackend> {
        ProductRepository::new(Arc::clone(backend), "products", "product-images")
    }

    #[tokio::test]
    async fn test_home_page_excludes_best_deals() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed("products", "p1", product_body("Lamp", "Furniture", 25.0));
        backend.seed("products", "p2", product_body("Sale Lamp", BEST_DEALS_CATEGORY, 10.0));
        let repo = repo(&backend);

        let home = repo.page(None, 10, 0).await.expect("page");
        assert_eq!(home.len(), 1);
        assert_eq!(home.first().map(|p| p.name.as_str()), Some("Lamp"));

        let deals = repo.best_deals(10).await.expect("deals");
        assert_eq!(deals.len(), 1);
    }

    #[tokio::test]
    async fn test_get_uses_cache_after_first_fetch() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed("products", "p1", product_body("Lamp", "Furniture", 25.0));
        let repo = repo(&backend);

        let id = ProductId::new("p1");
        let first = repo.get(&id).await.expect("get");

        // Remove the backing document; the cache should still serve it.
        backend.set_fail_writes(false);
        let _ = backend.delete_document("products", "p1").await;
        let second = repo.get(&id).await.expect("cached get");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_add_uploads_images_then_creates_document() {
        let backend = Arc::new(MemoryBackend::new());
        let repo = repo(&backend);

        let product = repo
            .add(
                NewProduct {
                    name: "Chair".to_string(),
                    category: "Furniture".to_string(),
                    price: Price::from_minor_units(4999),
                    free_shipping: true,
                    stock: 3,
                    discount: None,
                    description: None,
                    details: None,
                    colors: vec![],
                    sizes: vec![],
                },
                vec![(vec![1, 2, 3], "chair.jpg".to_string(), "image/jpeg".to_string())],
            )
            .await
            .expect("add");

        assert_eq!(backend.uploaded_files().len(), 1);
        assert_eq!(product.images.len(), 1);
        assert!(product.images[0].starts_with("memory://"));
        assert_eq!(backend.document_count("products"), 1);
    }

    #[tokio::test]
    async fn test_search_matches_name_or_category() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed("products", "p1", product_body("Desk Lamp", "Furniture", 25.0));
        backend.seed("products", "p2", product_body("Novel", "Books", 9.0));
        let repo = repo(&backend);

        let hits = repo.search("books").await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().map(|p| p.name.as_str()), Some("Novel"));
    }
}

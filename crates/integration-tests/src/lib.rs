//! Integration tests for the Thriftr client core.
//!
//! Tests run the full service graph (`App` -> `Session` -> services ->
//! repositories) over the in-memory backend, with tokio's paused clock
//! driving the debounce and undo timers deterministically.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p thriftr-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use serde_json::json;

use thriftr_client::backend::MemoryBackend;
use thriftr_client::config::{BucketIds, CollectionIds};
use thriftr_client::{App, Session};

/// A fully wired app plus its backing store.
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub app: App<MemoryBackend>,
}

impl TestContext {
    /// An empty store with default collection names.
    #[must_use]
    pub fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let app = App::new(
            Arc::clone(&backend),
            CollectionIds {
                users: "users".to_string(),
                products: "products".to_string(),
                carts: "carts".to_string(),
                wishlists: "wishlists".to_string(),
                orders: "orders".to_string(),
            },
            BucketIds {
                product_images: "product-images".to_string(),
                profile_images: "profile-images".to_string(),
            },
        );
        Self { backend, app }
    }

    /// Seed a product document with the given price.
    pub fn seed_product(&self, id: &str, name: &str, category: &str, price: f64) {
        self.backend.seed(
            "products",
            id,
            json!({
                "name": name,
                "category": category,
                "price": price,
                "stock": 10,
                "sizes": ["S", "M", "L"],
            }),
        );
    }

    /// Register a fresh user and open their session.
    ///
    /// # Panics
    ///
    /// Panics if registration fails (test-only helper).
    pub async fn signed_in_session(&self) -> Session<MemoryBackend> {
        self.app
            .sign_up("shopper@example.com", "hunter2!", "Test", "Shopper")
            .await
            .expect("sign up")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

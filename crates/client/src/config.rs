//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `APPWRITE_PROJECT_ID` - Appwrite project ID
//! - `APPWRITE_API_KEY` - Appwrite API key (kept secret)
//! - `APPWRITE_DATABASE_ID` - Database holding all collections
//!
//! ## Optional
//! - `APPWRITE_ENDPOINT` - API endpoint (default: `https://cloud.appwrite.io/v1`)
//! - `APPWRITE_USER_COLLECTION_ID` - default: `users`
//! - `APPWRITE_PRODUCT_COLLECTION_ID` - default: `products`
//! - `APPWRITE_CART_COLLECTION_ID` - default: `carts`
//! - `APPWRITE_WISHLIST_COLLECTION_ID` - default: `wishlists`
//! - `APPWRITE_ORDER_COLLECTION_ID` - default: `orders`
//! - `APPWRITE_PRODUCT_IMAGE_BUCKET_ID` - default: `product-images`
//! - `APPWRITE_PROFILE_IMAGE_BUCKET_ID` - default: `profile-images`

use secrecy::SecretString;
use thiserror::Error;

/// Default Appwrite cloud endpoint.
const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Collection IDs within the configured database.
#[derive(Debug, Clone)]
pub struct CollectionIds {
    pub users: String,
    pub products: String,
    pub carts: String,
    pub wishlists: String,
    pub orders: String,
}

/// Storage bucket IDs.
#[derive(Debug, Clone)]
pub struct BucketIds {
    pub product_images: String,
    pub profile_images: String,
}

/// Client application configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AppConfig {
    /// Appwrite API endpoint (e.g., `https://cloud.appwrite.io/v1`).
    pub endpoint: String,
    /// Appwrite project ID.
    pub project_id: String,
    /// Appwrite API key.
    pub api_key: SecretString,
    /// Database holding all per-user collections.
    pub database_id: String,
    /// Collection IDs.
    pub collections: CollectionIds,
    /// Storage bucket IDs.
    pub buckets: BucketIds,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field("database_id", &self.database_id)
            .field("collections", &self.collections)
            .field("buckets", &self.buckets)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            endpoint: optional("APPWRITE_ENDPOINT", DEFAULT_ENDPOINT),
            project_id: required("APPWRITE_PROJECT_ID")?,
            api_key: SecretString::from(required("APPWRITE_API_KEY")?),
            database_id: required("APPWRITE_DATABASE_ID")?,
            collections: CollectionIds {
                users: optional("APPWRITE_USER_COLLECTION_ID", "users"),
                products: optional("APPWRITE_PRODUCT_COLLECTION_ID", "products"),
                carts: optional("APPWRITE_CART_COLLECTION_ID", "carts"),
                wishlists: optional("APPWRITE_WISHLIST_COLLECTION_ID", "wishlists"),
                orders: optional("APPWRITE_ORDER_COLLECTION_ID", "orders"),
            },
            buckets: BucketIds {
                product_images: optional("APPWRITE_PRODUCT_IMAGE_BUCKET_ID", "product-images"),
                profile_images: optional("APPWRITE_PROFILE_IMAGE_BUCKET_ID", "profile-images"),
            },
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

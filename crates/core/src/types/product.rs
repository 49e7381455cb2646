//! Product catalog value type and fallible document decoding.
//!
//! Products are immutable values fetched from the document store. Decoding
//! is strict: a field with the wrong shape is a [`DecodeError`], never a
//! silently substituted default. Fields the schema genuinely allows to be
//! absent carry `#[serde(default)]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::id::ProductId;
use crate::types::price::Price;

/// Failed to decode a stored document into a typed value.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document body did not match the expected schema.
    #[error("malformed document {id}: {source}")]
    Document {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON-string-encoded record embedded in a document field was
    /// malformed (cart lines, orders, and addresses are stored this way).
    #[error("malformed embedded record in document {id}: {source}")]
    Embedded {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An immutable product snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Price,
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default = "default_stock")]
    pub stock: u32,
    #[serde(default)]
    pub discount: Option<Price>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

const fn default_stock() -> u32 {
    1
}

impl Product {
    /// Decode a product from a stored document's body.
    ///
    /// The document ID is authoritative; an `id` field inside the body is
    /// ignored in favor of it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Document`] if the body does not match the
    /// product schema.
    pub fn from_document(id: &ProductId, data: &serde_json::Value) -> Result<Self, DecodeError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Body {
            name: String,
            category: String,
            price: Price,
            #[serde(default)]
            free_shipping: bool,
            #[serde(default = "default_stock")]
            stock: u32,
            #[serde(default)]
            discount: Option<Price>,
            #[serde(default)]
            description: Option<String>,
            #[serde(default)]
            details: Option<String>,
            #[serde(default)]
            colors: Vec<String>,
            #[serde(default)]
            sizes: Vec<String>,
            #[serde(default)]
            images: Vec<String>,
        }

        let body: Body =
            serde_json::from_value(data.clone()).map_err(|source| DecodeError::Document {
                id: id.to_string(),
                source,
            })?;

        Ok(Self {
            id: id.clone(),
            name: body.name,
            category: body.category,
            price: body.price,
            free_shipping: body.free_shipping,
            stock: body.stock,
            discount: body.discount,
            description: body.description,
            details: body.details,
            colors: body.colors,
            sizes: body.sizes,
            images: body.images,
        })
    }

    /// Whether any units are available.
    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether the product carries a nonzero discount.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.discount
            .is_some_and(|d| d.amount() > rust_decimal::Decimal::ZERO)
    }
}

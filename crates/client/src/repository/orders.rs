//! Remote order history access.
//!
//! One document per user with an `orders` array of JSON-encoded strings,
//! newest appended last. Strict decoding, same as the cart.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::instrument;
use uuid::Uuid;

use thriftr_core::{DecodeError, Order, OrderId, OrderStatus, UserId};

use crate::backend::{BackendError, Document, DocumentStore, Query};
use crate::error::{AppError, Result};
use crate::repository::{read_err, write_err};

/// Reads and appends to one user's order history.
pub struct OrderRepository<B> {
    backend: Arc<B>,
    collection: String,
    user: UserId,
}

impl<B: DocumentStore> OrderRepository<B> {
    /// Scope a repository to one user's orders.
    #[must_use]
    pub fn new(backend: Arc<B>, collection: impl Into<String>, user: UserId) -> Self {
        Self {
            backend,
            collection: collection.into(),
            user,
        }
    }

    /// All orders placed by the user, oldest first.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self) -> Result<Vec<Order>> {
        match self.find_document().await? {
            Some(doc) => decode_orders(&doc),
            None => Ok(Vec::new()),
        }
    }

    /// Append a placed order.
    #[instrument(skip(self, order), fields(order = %order.id), level = "debug")]
    pub async fn place(&self, order: &Order) -> Result<()> {
        let existing = self.find_document().await?;
        let mut orders = match &existing {
            Some(doc) => decode_orders(doc)?,
            None => Vec::new(),
        };
        orders.push(order.clone());
        self.store(existing, &orders).await
    }

    /// Rewrite one order's status (cancellation, fulfilment updates).
    #[instrument(skip(self), level = "debug")]
    pub async fn update_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<()> {
        let Some(doc) = self.find_document().await? else {
            return Err(AppError::RemoteRead(BackendError::NotFound(format!(
                "order {order_id}"
            ))));
        };
        let mut orders = decode_orders(&doc)?;
        let slot = orders.iter_mut().find(|o| &o.id == order_id).ok_or_else(|| {
            AppError::RemoteRead(BackendError::NotFound(format!("order {order_id}")))
        })?;
        slot.status = status;
        self.store(Some(doc), &orders).await
    }

    async fn store(&self, existing: Option<Document>, orders: &[Order]) -> Result<()> {
        let encoded: Vec<String> = orders
            .iter()
            .map(|o| serde_json::to_string(o).map_err(BackendError::Parse))
            .collect::<std::result::Result<_, _>>()
            .map_err(write_err)?;
        let body = json!({
            "userId": self.user.as_str(),
            "orders": encoded,
        });

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
}

fn decode_orders(doc: &Document) -> Result<Vec<Order>> {
    let elements = doc
        .data
        .get("orders")
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
            serde_json::from_str::<Order>(&text).map_err(|source| {
                AppError::Decode(DecodeError::Embedded {
                    id: doc.id.clone(),
                    source,
                })
            })
        })
        .collect()
}

//! Order types and checkout totals.
//!
//! Orders live in one document per user whose `orders` field holds a list of
//! JSON-encoded order strings, so [`Order`] round-trips through
//! `serde_json::to_string` per entry. "Placing" an order persists a document;
//! there is no payment processing.

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::cart::CartLine;
use crate::types::id::{OrderId, ProductId};
use crate::types::price::Price;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Placed,
    Shipped,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "Placed"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One purchased line within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub total: Price,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub shipping_address: String,
}

impl Order {
    /// Build a new `Placed` order from effective cart lines.
    #[must_use]
    pub fn from_cart(lines: &[CartLine], total: Price, shipping_address: String) -> Self {
        Self {
            id: OrderId::new(uuid::Uuid::new_v4().to_string()),
            total,
            status: OrderStatus::Placed,
            items: lines
                .iter()
                .map(|line| OrderItem {
                    product_id: line.product.id.clone(),
                    name: line.product.name.clone(),
                    price: line.product.price,
                    quantity: line.quantity,
                })
                .collect(),
            // Stored at millisecond precision; truncate so the encoded
            // order decodes back to an equal value.
            created_at: Utc::now().trunc_subsecs(3),
            shipping_address,
        }
    }
}

/// Checkout cost breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Tax rate applied at checkout.
const TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2); // 0.18

/// Flat shipping fee.
const SHIPPING_FEE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

impl OrderSummary {
    /// Compute the checkout breakdown for a set of cart lines.
    #[must_use]
    pub fn calculate(lines: &[CartLine]) -> Self {
        let subtotal: Decimal = lines.iter().map(CartLine::line_total).sum();
        let tax = subtotal * TAX_RATE;
        let total = subtotal + tax + SHIPPING_FEE;
        Self {
            subtotal,
            tax,
            shipping: SHIPPING_FEE,
            total,
        }
    }
}

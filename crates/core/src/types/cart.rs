//! Cart line-item types and the line-item identity key.
//!
//! A line item is one (product, size, color) combination and its quantity.
//! [`CartItem`] is the wire shape persisted inside the remote cart document;
//! [`CartLine`] is the display shape with the product snapshot attached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;
use crate::types::product::Product;

/// Stable identity for a (product, variant) pair.
///
/// Absent and empty-string size/color are collapsed to the same canonical
/// empty token, so `(p, None, None)` and `(p, Some(""), Some(""))` produce
/// equal keys by design. Pure value type: equality and hashing only, no
/// ordering semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineItemKey {
    product_id: ProductId,
    size: String,
    color: String,
}

impl LineItemKey {
    /// Derive the key for a product and optional variant selections.
    #[must_use]
    pub fn new(product_id: &ProductId, size: Option<&str>, color: Option<&str>) -> Self {
        Self {
            product_id: product_id.clone(),
            size: size.unwrap_or_default().to_string(),
            color: color.unwrap_or_default().to_string(),
        }
    }

    /// The product this key belongs to.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product_id
    }
}

impl std::fmt::Display for LineItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.product_id, self.size, self.color)
    }
}

/// Wire shape of one cart line inside the remote cart document.
///
/// The backend schema stores each line as an independently JSON-encoded
/// string in the document's `products` field, so this struct round-trips
/// through `serde_json::to_string` per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
}

impl CartItem {
    /// Identity key for this line.
    #[must_use]
    pub fn key(&self) -> LineItemKey {
        LineItemKey::new(
            &self.product_id,
            self.selected_size.as_deref(),
            self.selected_color.as_deref(),
        )
    }
}

/// A cart line joined with its product snapshot, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
}

impl CartLine {
    /// Identity key for this line.
    #[must_use]
    pub fn key(&self) -> LineItemKey {
        LineItemKey::new(
            &self.product.id,
            self.selected_size.as_deref(),
            self.selected_color.as_deref(),
        )
    }

    /// Price times quantity for this line, exact decimal arithmetic.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }

    /// The wire shape of this line.
    #[must_use]
    pub fn to_item(&self) -> CartItem {
        CartItem {
            product_id: self.product.id.clone(),
            quantity: self.quantity,
            selected_size: self.selected_size.clone(),
            selected_color: self.selected_color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_collapses_none_and_empty() {
        let id = ProductId::new("p1");
        let none = LineItemKey::new(&id, None, None);
        let empty = LineItemKey::new(&id, Some(""), Some(""));
        assert_eq!(none, empty);
    }

    #[test]
    fn test_key_distinguishes_variants() {
        let id = ProductId::new("p1");
        let medium = LineItemKey::new(&id, Some("M"), Some("Red"));
        let large = LineItemKey::new(&id, Some("L"), Some("Red"));
        assert_ne!(medium, large);
        assert_ne!(medium, LineItemKey::new(&id, Some("M"), None));
    }

    #[test]
    fn test_key_display() {
        let id = ProductId::new("p1");
        let key = LineItemKey::new(&id, Some("M"), Some("Red"));
        assert_eq!(key.to_string(), "p1-M-Red");
        assert_eq!(LineItemKey::new(&id, None, None).to_string(), "p1--");
    }

    #[test]
    fn test_cart_item_wire_shape() {
        let item = CartItem {
            product_id: ProductId::new("p1"),
            quantity: 2,
            selected_size: Some("M".to_string()),
            selected_color: None,
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"productId\":\"p1\""));
        assert!(json.contains("\"selectedSize\":\"M\""));
        let back: CartItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, item);
    }
}

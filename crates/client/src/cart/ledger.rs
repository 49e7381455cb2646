//! In-memory authoritative cart state.
//!
//! The ledger merges the last-known-synced cart (`confirmed`) with local
//! optimistic overrides (`pending`) into a single linearized projection.
//! All mutations are synchronous; remote writes happen elsewhere and are
//! reconciled back through [`CartLedger::apply_confirmed`].
//!
//! Effective quantity for a key is `pending ?? confirmed ?? 0`, and a key
//! whose effective quantity is zero never appears in the projection.

use std::collections::HashMap;

use rust_decimal::Decimal;

use thriftr_core::{CartLine, LineItemKey, Product, ProductId};

use crate::error::{AppError, Result};

/// Product snapshot and variant selection for one known line.
#[derive(Debug, Clone)]
struct LineMeta {
    product: Product,
    selected_size: Option<String>,
    selected_color: Option<String>,
}

/// The authoritative logical cart for one session.
#[derive(Debug, Default)]
pub struct CartLedger {
    /// Metadata for every key the ledger has ever resolved this session.
    meta: HashMap<LineItemKey, LineMeta>,
    /// Quantities from the last successful sync with the remote document.
    confirmed: HashMap<LineItemKey, u32>,
    /// Local optimistic overrides not yet confirmed written. A value of 0
    /// is an explicit pending removal, distinct from "no override".
    pending: HashMap<LineItemKey, u32>,
    /// First-seen order of keys; drives projection order.
    order: Vec<LineItemKey>,
}

impl CartLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the confirmed state after a full remote fetch.
    ///
    /// Pending overrides survive: a background refresh that raced with a
    /// local edit must not clobber the user's last intent.
    pub fn set_confirmed(&mut self, lines: Vec<CartLine>) {
        self.confirmed.clear();
        for line in lines {
            let key = line.key();
            self.confirmed.insert(key.clone(), line.quantity);
            self.remember(key, line.product, line.selected_size, line.selected_color);
        }
        self.prune();
    }

    /// Apply an optimistic quantity change.
    ///
    /// A quantity of 0 removes the line. For a key the ledger has never
    /// seen, `resolved` must carry the product snapshot; otherwise the
    /// mutation is rejected with [`AppError::ProductUnresolved`].
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        size: Option<&str>,
        color: Option<&str>,
        quantity: u32,
        resolved: Option<&Product>,
    ) -> Result<LineItemKey> {
        let key = LineItemKey::new(product_id, size, color);

        if !self.meta.contains_key(&key) {
            if quantity == 0 {
                // Removing a line that was never there: record the intent
                // anyway so a racing refresh cannot resurrect it.
                self.pending.insert(key.clone(), 0);
                return Ok(key);
            }
            let product = resolved
                .ok_or_else(|| AppError::ProductUnresolved(product_id.clone()))?
                .clone();
            self.remember(
                key.clone(),
                product,
                size.map(str::to_string),
                color.map(str::to_string),
            );
        }

        self.pending.insert(key.clone(), quantity);
        Ok(key)
    }

    /// Effective quantity for a key: `pending ?? confirmed ?? 0`.
    #[must_use]
    pub fn effective_quantity(&self, key: &LineItemKey) -> u32 {
        self.pending
            .get(key)
            .or_else(|| self.confirmed.get(key))
            .copied()
            .unwrap_or(0)
    }

    /// The merged projection the UI reads. Zero-quantity keys are excluded.
    #[must_use]
    pub fn effective_items(&self) -> Vec<CartLine> {
        self.order
            .iter()
            .filter_map(|key| {
                let quantity = self.effective_quantity(key);
                if quantity == 0 {
                    return None;
                }
                self.meta.get(key).map(|meta| CartLine {
                    product: meta.product.clone(),
                    quantity,
                    selected_size: meta.selected_size.clone(),
                    selected_color: meta.selected_color.clone(),
                })
            })
            .collect()
    }

    /// Sum of `price * quantity` over the projection. Exact decimal math.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.effective_items()
            .iter()
            .map(CartLine::line_total)
            .sum()
    }

    /// Whether a key currently appears in the projection.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId, size: Option<&str>, color: Option<&str>) -> bool {
        self.effective_quantity(&LineItemKey::new(product_id, size, color)) > 0
    }

    /// Reconcile a successfully synced write.
    ///
    /// The pending override is dropped only if it still carries the synced
    /// quantity; a later local edit stays pending until its own sync lands.
    pub fn apply_confirmed(&mut self, key: &LineItemKey, quantity: u32) {
        if quantity == 0 {
            self.confirmed.remove(key);
        } else {
            self.confirmed.insert(key.clone(), quantity);
        }
        if self.pending.get(key) == Some(&quantity) {
            self.pending.remove(key);
        }
        self.prune();
    }

    /// Discard everything (logout, explicit clear).
    pub fn clear(&mut self) {
        self.meta.clear();
        self.confirmed.clear();
        self.pending.clear();
        self.order.clear();
    }

    /// Whether any local override is still awaiting confirmation.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn remember(
        &mut self,
        key: LineItemKey,
        product: Product,
        selected_size: Option<String>,
        selected_color: Option<String>,
    ) {
        if !self.meta.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.meta.insert(
            key,
            LineMeta {
                product,
                selected_size,
                selected_color,
            },
        );
    }

    /// Drop bookkeeping for keys that are absent everywhere.
    fn prune(&mut self) {
        let dead: Vec<LineItemKey> = self
            .order
            .iter()
            .filter(|key| {
                !self.confirmed.contains_key(*key) && !self.pending.contains_key(*key)
            })
            .cloned()
            .collect();
        for key in dead {
            self.meta.remove(&key);
            self.order.retain(|k| k != &key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use thriftr_core::Price;

    fn product(id: &str, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("product {id}"),
            category: "Clothing".to_string(),
            price: Price::new(price),
            free_shipping: false,
            stock: 10,
            discount: None,
            description: None,
            details: None,
            colors: vec![],
            sizes: vec!["M".to_string()],
            images: vec![],
        }
    }

    fn line(id: &str, price: Decimal, quantity: u32) -> CartLine {
        CartLine {
            product: product(id, price),
            quantity,
            selected_size: None,
            selected_color: None,
        }
    }

    #[test]
    fn test_burst_of_edits_last_value_wins_before_sync() {
        let mut ledger = CartLedger::new();
        let p = product("p1", dec!(19.99));
        let id = p.id.clone();

        for quantity in [1, 5, 3, 7] {
            ledger
                .set_quantity(&id, Some("M"), Some("Red"), quantity, Some(&p))
                .expect("set");
        }

        let items = ledger.effective_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().map(|l| l.quantity), Some(7));
    }

    #[test]
    fn test_zero_quantity_removes_from_projection() {
        let mut ledger = CartLedger::new();
        let p = product("p1", dec!(19.99));

        ledger
            .set_quantity(&p.id.clone(), Some("M"), Some("Red"), 2, Some(&p))
            .expect("set");
        assert_eq!(ledger.effective_items().len(), 1);

        ledger
            .set_quantity(&p.id.clone(), Some("M"), Some("Red"), 0, None)
            .expect("remove");
        assert!(ledger.effective_items().is_empty());
    }

    #[test]
    fn test_new_line_requires_resolved_product() {
        let mut ledger = CartLedger::new();
        let err = ledger
            .set_quantity(&ProductId::new("ghost"), None, None, 2, None)
            .expect_err("must reject");
        assert!(matches!(err, AppError::ProductUnresolved(_)));
    }

    #[test]
    fn test_pending_survives_confirmed_refresh() {
        let mut ledger = CartLedger::new();
        let p = product("p1", dec!(10));

        ledger.set_confirmed(vec![line("p1", dec!(10), 1)]);
        ledger
            .set_quantity(&p.id.clone(), None, None, 4, Some(&p))
            .expect("set");

        // A background refresh lands with the stale quantity.
        ledger.set_confirmed(vec![line("p1", dec!(10), 1)]);

        let items = ledger.effective_items();
        assert_eq!(items.first().map(|l| l.quantity), Some(4));
    }

    #[test]
    fn test_apply_confirmed_clears_matching_pending_only() {
        let mut ledger = CartLedger::new();
        let p = product("p1", dec!(10));
        let key = ledger
            .set_quantity(&p.id.clone(), None, None, 4, Some(&p))
            .expect("set");

        // User edits again before the first write confirms.
        ledger
            .set_quantity(&p.id.clone(), None, None, 6, None)
            .expect("set");

        ledger.apply_confirmed(&key, 4);
        assert!(ledger.has_pending());
        assert_eq!(ledger.effective_quantity(&key), 6);

        ledger.apply_confirmed(&key, 6);
        assert!(!ledger.has_pending());
        assert_eq!(ledger.effective_quantity(&key), 6);
    }

    #[test]
    fn test_total_amount_is_exact_and_reversible() {
        let mut ledger = CartLedger::new();
        let p1 = product("p1", dec!(19.99));

        ledger.set_confirmed(vec![line("p2", dec!(0.10), 3)]);
        let before = ledger.total_amount();
        assert_eq!(before, dec!(0.30));

        ledger
            .set_quantity(&p1.id.clone(), None, None, 3, Some(&p1))
            .expect("add");
        assert_eq!(ledger.total_amount(), dec!(60.27));

        ledger
            .set_quantity(&p1.id.clone(), None, None, 0, None)
            .expect("remove");
        assert_eq!(ledger.total_amount(), before);
    }

    #[test]
    fn test_variant_keys_are_distinct_lines() {
        let mut ledger = CartLedger::new();
        let p = product("p1", dec!(5));

        ledger
            .set_quantity(&p.id.clone(), Some("M"), None, 1, Some(&p))
            .expect("set");
        ledger
            .set_quantity(&p.id.clone(), Some("L"), None, 2, Some(&p))
            .expect("set");

        assert_eq!(ledger.effective_items().len(), 2);
        assert!(ledger.contains(&p.id, Some("M"), None));
        assert!(!ledger.contains(&p.id, Some("S"), None));
    }

    #[test]
    fn test_projection_keeps_insertion_order() {
        let mut ledger = CartLedger::new();
        let a = product("a", dec!(1));
        let b = product("b", dec!(2));
        let c = product("c", dec!(3));

        for p in [&a, &b, &c] {
            ledger
                .set_quantity(&p.id.clone(), None, None, 1, Some(p))
                .expect("set");
        }
        // Editing an existing line must not move it.
        ledger
            .set_quantity(&a.id.clone(), None, None, 5, None)
            .expect("edit");

        let ids: Vec<String> = ledger
            .effective_items()
            .iter()
            .map(|l| l.product.id.to_string())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}

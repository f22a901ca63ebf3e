//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::line_items::{LineItem, LineItems, QuantityChange};
use crate::domain::aggregates::product::ProductRef;
use crate::domain::aggregates::selection::Selection;
use crate::domain::value_objects::ProductId;
use crate::{Result, StorefrontError};

const SNAPSHOT_VERSION: u32 = 1;

/// The session's single shopping cart plus its selection overlay.
///
/// Only the line items are persisted; the selection lives for the UI session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cart {
    items: LineItems,
    selection: Selection,
}

#[derive(Serialize, Deserialize)]
struct CartSnapshot { version: u32, items: LineItems }

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &LineItems { &self.items }
    pub fn selection(&self) -> &Selection { &self.selection }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn line_count(&self) -> usize { self.items.len() }
    pub fn unit_count(&self) -> u32 { self.items.unit_count() }
    pub fn total(&self) -> Decimal { self.items.total() }

    pub fn add(&mut self, product: &ProductRef, quantity: u32) -> Result<QuantityChange> {
        self.items.add_or_increment(product, quantity)
    }

    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<QuantityChange> {
        let line_id = self.line(product_id)?.line_id;
        self.items.set_quantity(line_id, quantity)
    }

    pub fn increment(&mut self, product_id: &ProductId) -> Result<QuantityChange> { self.items.increment(product_id) }
    pub fn decrement(&mut self, product_id: &ProductId) -> Result<QuantityChange> { self.items.decrement(product_id) }

    pub fn remove(&mut self, product_id: &ProductId) -> Option<LineItem> {
        let removed = self.items.remove_product(product_id)?;
        self.selection.remove(product_id);
        Some(removed)
    }

    pub fn clear(&mut self) -> usize { self.selection.clear(); self.items.clear() }

    // -------------------------------------------------------------------------
    // Selection overlay
    // -------------------------------------------------------------------------

    pub fn select(&mut self, product_id: &ProductId) -> Result<()> {
        self.line(product_id)?;
        self.selection.insert(product_id.clone());
        Ok(())
    }

    pub fn deselect(&mut self, product_id: &ProductId) -> bool { self.selection.remove(product_id) }

    pub fn select_all(&mut self) {
        for line in &self.items { self.selection.insert(line.product_id.clone()); }
    }

    pub fn deselect_all(&mut self) { self.selection.clear() }

    pub fn selected_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|l| self.selection.contains(&l.product_id))
    }

    pub fn selected_total(&self) -> Decimal { self.selected_items().map(LineItem::line_total).sum() }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&CartSnapshot { version: SNAPSHOT_VERSION, items: self.items.clone() })?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: CartSnapshot = serde_json::from_slice(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorefrontError::Storage(format!("unsupported cart snapshot version {}", snapshot.version)));
        }
        Ok(Self { items: snapshot.items.reconciled(), selection: Selection::default() })
    }

    fn line(&self, product_id: &ProductId) -> Result<&LineItem> {
        self.items.find_product(product_id).ok_or_else(|| StorefrontError::LineNotFound(product_id.to_string()))
    }
}

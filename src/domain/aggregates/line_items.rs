//! Line-item store shared by the cart and order drafts

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::product::ProductRef;
use crate::domain::value_objects::{LineId, ProductId};
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    /// Stock ceiling known from the most recent successful lookup.
    pub stock: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl LineItem {
    fn from_product(product: &ProductRef, quantity: u32) -> Self {
        Self {
            line_id: LineId::generate(), product_id: product.id.clone(), product_name: product.name.clone(),
            unit_price: product.unit_price, quantity, stock: product.stock, image: product.image.clone(),
        }
    }

    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }

    fn insufficient(&self, requested: u32) -> StorefrontError {
        StorefrontError::InsufficientStock {
            product_id: self.product_id.clone(), name: self.product_name.clone(), requested, available: self.stock,
        }
    }
}

/// Result of a quantity mutation that was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityChange {
    Set(u32),
    /// The request overshot the stock ceiling (or undershot 1) and was clamped.
    Clamped { requested: u32, applied: u32 },
    Unchanged(u32),
}

impl QuantityChange {
    pub fn quantity(&self) -> u32 {
        match *self { Self::Set(q) | Self::Unchanged(q) => q, Self::Clamped { applied, .. } => applied }
    }
}

/// Ordered collection of line items, unique by product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItems(Vec<LineItem>);

impl LineItems {
    pub fn new() -> Self { Self::default() }
    pub fn as_slice(&self) -> &[LineItem] { &self.0 }
    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> { self.0.iter() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn get(&self, line_id: LineId) -> Option<&LineItem> { self.0.iter().find(|l| l.line_id == line_id) }
    pub fn find_product(&self, product_id: &ProductId) -> Option<&LineItem> { self.0.iter().find(|l| &l.product_id == product_id) }
    pub fn unit_count(&self) -> u32 { self.0.iter().map(|l| l.quantity).sum() }

    /// Adds `requested` units of `product`, merging into an existing line.
    ///
    /// An existing line is never pushed past the stock ceiling: the increment
    /// is rejected and the quantity stays as it was. A new line is created
    /// with at most `product.stock` units.
    pub fn add_or_increment(&mut self, product: &ProductRef, requested: u32) -> Result<QuantityChange> {
        if !product.is_in_stock() {
            return Err(StorefrontError::OutOfStock { product_id: product.id.clone(), name: product.name.clone() });
        }
        if requested == 0 { return Err(StorefrontError::InvalidQuantity); }

        if let Some(line) = self.0.iter_mut().find(|l| l.product_id == product.id) {
            let wanted = line.quantity.saturating_add(requested);
            if wanted > product.stock {
                return Err(StorefrontError::InsufficientStock {
                    product_id: product.id.clone(), name: product.name.clone(), requested: wanted, available: product.stock,
                });
            }
            line.quantity = wanted;
            line.stock = product.stock;
            return Ok(QuantityChange::Set(wanted));
        }

        let applied = requested.min(product.stock);
        self.0.push(LineItem::from_product(product, applied));
        if applied < requested { Ok(QuantityChange::Clamped { requested, applied }) } else { Ok(QuantityChange::Set(applied)) }
    }

    /// Stores `quantity` clamped to `[1, known stock]`.
    pub fn set_quantity(&mut self, line_id: LineId, quantity: u32) -> Result<QuantityChange> {
        let line = self.0.iter_mut().find(|l| l.line_id == line_id).ok_or_else(|| StorefrontError::LineNotFound(line_id.to_string()))?;
        let applied = quantity.clamp(1, line.stock.max(1));
        line.quantity = applied;
        if applied == quantity { Ok(QuantityChange::Set(applied)) } else { Ok(QuantityChange::Clamped { requested: quantity, applied }) }
    }

    pub fn increment(&mut self, product_id: &ProductId) -> Result<QuantityChange> {
        let line = self.line_mut(product_id)?;
        let wanted = line.quantity.saturating_add(1);
        if wanted > line.stock { return Err(line.insufficient(wanted)); }
        line.quantity = wanted;
        Ok(QuantityChange::Set(wanted))
    }

    /// Lowers the quantity by one; a line at 1 stays at 1.
    pub fn decrement(&mut self, product_id: &ProductId) -> Result<QuantityChange> {
        let line = self.line_mut(product_id)?;
        if line.quantity <= 1 { return Ok(QuantityChange::Unchanged(line.quantity)); }
        line.quantity -= 1;
        Ok(QuantityChange::Set(line.quantity))
    }

    pub fn remove(&mut self, line_id: LineId) -> Option<LineItem> {
        let idx = self.0.iter().position(|l| l.line_id == line_id)?;
        Some(self.0.remove(idx))
    }

    pub fn remove_product(&mut self, product_id: &ProductId) -> Option<LineItem> {
        let idx = self.0.iter().position(|l| &l.product_id == product_id)?;
        Some(self.0.remove(idx))
    }

    pub fn clear(&mut self) -> usize { let n = self.0.len(); self.0.clear(); n }

    pub fn total(&self) -> Decimal { self.0.iter().map(LineItem::line_total).sum() }

    /// Re-establishes the collection invariants on lines read back from
    /// storage: duplicate products are merged into their first line, line ids
    /// are made unique and every quantity is clamped to `[1, known stock]`.
    pub fn reconciled(self) -> Self {
        let mut lines: Vec<LineItem> = Vec::with_capacity(self.0.len());
        for mut line in self.0 {
            if let Some(first) = lines.iter_mut().find(|l| l.product_id == line.product_id) {
                first.quantity = first.quantity.saturating_add(line.quantity);
                first.stock = first.stock.max(line.stock);
                continue;
            }
            if lines.iter().any(|l| l.line_id == line.line_id) { line.line_id = LineId::generate(); }
            lines.push(line);
        }
        for line in &mut lines { line.quantity = line.quantity.clamp(1, line.stock.max(1)); }
        Self(lines)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Result<&mut LineItem> {
        self.0.iter_mut().find(|l| &l.product_id == product_id).ok_or_else(|| StorefrontError::LineNotFound(product_id.to_string()))
    }
}

impl<'a> IntoIterator for &'a LineItems {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::test_support::product;

    #[test]
    fn test_add_merges_same_product() {
        let mut items = LineItems::new();
        let p = product("p1", 50000, 10);
        items.add_or_increment(&p, 1).unwrap();
        items.add_or_increment(&p, 2).unwrap();
        items.add_or_increment(&product("p2", 1000, 5), 1).unwrap();
        items.add_or_increment(&p, 1).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.find_product(&"p1".into()).unwrap().quantity, 4);
    }

    #[test]
    fn test_out_of_stock_product_is_rejected() {
        let mut items = LineItems::new();
        let err = items.add_or_increment(&product("p1", 50000, 0), 1).unwrap_err();
        assert!(matches!(err, StorefrontError::OutOfStock { .. }));
        assert!(items.is_empty());
    }

    #[test]
    fn test_increment_past_stock_keeps_quantity() {
        let mut items = LineItems::new();
        let p = product("p1", 50000, 3);
        items.add_or_increment(&p, 2).unwrap();
        let err = items.add_or_increment(&p, 2).unwrap_err();
        assert!(matches!(err, StorefrontError::InsufficientStock { requested: 4, available: 3, .. }));
        assert_eq!(items.find_product(&p.id).unwrap().quantity, 2);
        items.increment(&p.id).unwrap();
        assert!(items.increment(&p.id).is_err());
        assert_eq!(items.find_product(&p.id).unwrap().quantity, 3);
    }

    #[test]
    fn test_new_line_is_clamped_to_stock() {
        let mut items = LineItems::new();
        let change = items.add_or_increment(&product("p1", 50000, 2), 5).unwrap();
        assert_eq!(change, QuantityChange::Clamped { requested: 5, applied: 2 });
        assert_eq!(items.as_slice()[0].quantity, 2);
    }

    #[test]
    fn test_readd_refreshes_known_stock() {
        let mut items = LineItems::new();
        items.add_or_increment(&product("p1", 50000, 2), 1).unwrap();
        items.add_or_increment(&product("p1", 50000, 8), 1).unwrap();
        assert_eq!(items.as_slice()[0].stock, 8);
    }

    #[test]
    fn test_set_quantity_clamps_both_ends() {
        let mut items = LineItems::new();
        items.add_or_increment(&product("p1", 50000, 4), 1).unwrap();
        let id = items.as_slice()[0].line_id;
        assert_eq!(items.set_quantity(id, 9).unwrap(), QuantityChange::Clamped { requested: 9, applied: 4 });
        assert_eq!(items.get(id).unwrap().quantity, 4);
        assert_eq!(items.set_quantity(id, 0).unwrap(), QuantityChange::Clamped { requested: 0, applied: 1 });
        assert_eq!(items.set_quantity(id, 3).unwrap(), QuantityChange::Set(3));
        assert!(matches!(items.set_quantity(LineId::generate(), 1), Err(StorefrontError::LineNotFound(_))));
    }

    #[test]
    fn test_decrement_floors_at_one() {
        let mut items = LineItems::new();
        let p = product("p1", 50000, 5);
        items.add_or_increment(&p, 2).unwrap();
        assert_eq!(items.decrement(&p.id).unwrap(), QuantityChange::Set(1));
        assert_eq!(items.decrement(&p.id).unwrap(), QuantityChange::Unchanged(1));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_total_and_remove() {
        let mut items = LineItems::new();
        items.add_or_increment(&product("p1", 50000, 5), 2).unwrap();
        items.add_or_increment(&product("p2", 20000, 5), 1).unwrap();
        assert_eq!(items.total(), Decimal::new(120000, 0));
        let id = items.as_slice()[0].line_id;
        assert!(items.remove(id).is_some());
        assert!(items.remove(id).is_none());
        assert_eq!(items.total(), Decimal::new(20000, 0));
    }

    #[test]
    fn test_reconciled_merges_duplicates_and_clamps() {
        let line = |qty: u32, stock: u32| LineItem { quantity: qty, stock, ..LineItem::from_product(&product("p1", 100, stock), 1) };
        let mut other = LineItem::from_product(&product("p2", 100, 3), 1);
        other.quantity = 0;
        let items = LineItems(vec![line(0, 5), other, line(99, 5)]).reconciled();

        assert_eq!(items.len(), 2);
        assert_eq!(items.find_product(&"p1".into()).unwrap().quantity, 5);
        assert_eq!(items.find_product(&"p2".into()).unwrap().quantity, 1);
    }

    #[derive(Clone, Debug)]
    enum LineOp { Add(usize, u32), Set(usize, u32), Increment(usize), Decrement(usize), Remove(usize) }

    fn line_op() -> impl Strategy<Value = LineOp> {
        prop_oneof![
            (0..4usize, 0..8u32).prop_map(|(p, q)| LineOp::Add(p, q)),
            (0..4usize, 0..12u32).prop_map(|(p, q)| LineOp::Set(p, q)),
            (0..4usize).prop_map(LineOp::Increment),
            (0..4usize).prop_map(LineOp::Decrement),
            (0..4usize).prop_map(LineOp::Remove),
        ]
    }

    proptest! {
        #[test]
        fn lines_stay_unique_and_within_stock(ops in proptest::collection::vec(line_op(), 0..60)) {
            let catalog = [product("p0", 100, 1), product("p1", 200, 3), product("p2", 300, 6), product("p3", 400, 10)];
            let mut items = LineItems::new();
            for op in ops {
                let result = match op {
                    LineOp::Add(p, q) => items.add_or_increment(&catalog[p], q).map(|_| ()),
                    LineOp::Set(p, q) => match items.find_product(&catalog[p].id).map(|l| l.line_id) {
                        Some(id) => items.set_quantity(id, q).map(|_| ()),
                        None => Ok(()),
                    },
                    LineOp::Increment(p) => items.increment(&catalog[p].id).map(|_| ()),
                    LineOp::Decrement(p) => items.decrement(&catalog[p].id).map(|_| ()),
                    LineOp::Remove(p) => { items.remove_product(&catalog[p].id); Ok(()) }
                };
                let _ = result;
                let mut seen = std::collections::HashSet::new();
                for line in &items {
                    prop_assert!(seen.insert(line.product_id.clone()));
                    prop_assert!(line.quantity >= 1);
                    prop_assert!(line.quantity <= line.stock);
                }
                let expected: Decimal = items.iter().map(|l| l.unit_price * Decimal::from(l.quantity)).sum();
                prop_assert_eq!(items.total(), expected);
            }
        }
    }
}

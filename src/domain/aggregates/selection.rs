//! Selection overlay: cart lines included in the next checkout

use std::collections::BTreeSet;
use crate::domain::value_objects::ProductId;

/// Membership is maintained by [`Cart`](super::Cart), which prunes ids of
/// removed lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection(BTreeSet<ProductId>);

impl Selection {
    pub fn contains(&self, product_id: &ProductId) -> bool { self.0.contains(product_id) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &ProductId> { self.0.iter() }

    pub(crate) fn insert(&mut self, product_id: ProductId) -> bool { self.0.insert(product_id) }
    pub(crate) fn remove(&mut self, product_id: &ProductId) -> bool { self.0.remove(product_id) }
    pub(crate) fn clear(&mut self) { self.0.clear() }
}

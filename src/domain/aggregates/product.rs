//! Product snapshot captured at lookup time

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{ProductId, Sku};

/// What the engine knows about a product when it is added to a cart or draft.
///
/// The snapshot is never refreshed behind the caller's back: a price change on
/// the server does not alter lines that were already added, and `stock` stays
/// whatever it was at the last lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub stock: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub sku: Option<Sku>,
}

impl ProductRef {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, unit_price: Decimal, stock: u32) -> Self {
        Self { id: id.into(), name: name.into(), unit_price, stock, image: None, sku: None }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self { self.image = Some(image.into()); self }
    pub fn with_sku(mut self, sku: Sku) -> Self { self.sku = Some(sku); self }
    pub fn is_in_stock(&self) -> bool { self.stock > 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_product_snapshot() {
        let p = ProductRef::new("p1", "Ao thun", Decimal::new(50000, 0), 3).with_image("p1/front.jpg");
        assert!(p.is_in_stock());
        assert_eq!(p.image.as_deref(), Some("p1/front.jpg"));
        assert!(!ProductRef::new("p2", "Mu", Decimal::ONE, 0).is_in_stock());
    }
}

//! Checkout payload handed to the order placement backend

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::draft::CustomerInfo;
use crate::domain::aggregates::line_items::LineItem;
use crate::domain::value_objects::{DraftId, Money, ProductId};
use crate::{Result, StorefrontError};
use rust_decimal::Decimal;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { #[default] Cash, BankTransfer, Card, Cod }

/// Channel an order came in through
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource { Website, #[default] InStore, Phone, Social }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayloadItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl From<&LineItem> for PayloadItem {
    fn from(line: &LineItem) -> Self {
        Self { product_id: line.product_id.clone(), product_name: line.product_name.clone(), quantity: line.quantity, unit_price: line.unit_price }
    }
}

/// Immutable snapshot built fresh for every submission attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckoutPayload {
    pub customer: CustomerInfo,
    pub items: Vec<PayloadItem>,
    pub payment_method: PaymentMethod,
    pub total: Money,
    pub source: OrderSource,
    pub note: Option<String>,
    /// Signed-in user placing the order; attached right before placement.
    pub actor_id: Option<String>,
}

impl CheckoutPayload {
    /// Validates customer fields and lines, then snapshots them.
    pub fn build<'a>(
        customer: &CustomerInfo, lines: impl IntoIterator<Item = &'a LineItem>, payment_method: PaymentMethod,
        source: OrderSource, note: Option<String>, currency: &str,
    ) -> Result<Self> {
        customer.check()?;
        let items: Vec<PayloadItem> = lines.into_iter().map(PayloadItem::from).collect();
        if items.is_empty() { return Err(StorefrontError::Validation("Order has no items".into())); }
        let total = items.iter().map(|i| i.unit_price * Decimal::from(i.quantity)).sum();
        Ok(Self { customer: customer.clone(), items, payment_method, total: Money::new(total, currency), source, note, actor_id: None })
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self { self.actor_id = Some(actor_id.into()); self }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    #[serde(alias = "orderId")]
    pub order_id: String,
}

/// Submission state of a cart selection or draft: `Open -> Submitting -> Open`
/// on failure; a submitted draft is closed on success.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState { #[default] Open, Submitting }

/// Where a pending checkout came from, and so what it retires on success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "draft_id", rename_all = "snake_case")]
pub enum CheckoutOrigin { Cart, Draft(DraftId) }

/// A validated payload whose source has been marked as submitting.
#[derive(Clone, Debug)]
pub struct PendingCheckout {
    pub origin: CheckoutOrigin,
    pub payload: CheckoutPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::LineItems;
    use crate::test_support::{customer, product};

    #[test]
    fn test_build_computes_total() {
        let mut items = LineItems::new();
        items.add_or_increment(&product("p1", 50000, 5), 2).unwrap();
        items.add_or_increment(&product("p2", 15000, 5), 1).unwrap();
        let payload = CheckoutPayload::build(&customer(), &items, PaymentMethod::Cash, OrderSource::InStore, None, "VND").unwrap();
        assert_eq!(payload.total.amount(), Decimal::new(115000, 0));
        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[0].quantity, 2);
        assert!(payload.actor_id.is_none());
    }

    #[test]
    fn test_build_rejects_empty_lines() {
        let err = CheckoutPayload::build(&customer(), &LineItems::new(), PaymentMethod::Cash, OrderSource::InStore, None, "VND").unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
    }

    #[test]
    fn test_placed_order_accepts_camel_case() {
        let order: PlacedOrder = serde_json::from_str(r#"{"orderId":"o1"}"#).unwrap();
        assert_eq!(order.order_id, "o1");
    }
}

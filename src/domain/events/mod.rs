//! Domain events and user-facing notifications
use std::time::Duration;
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::CheckoutOrigin;
use crate::domain::value_objects::{DraftId, ProductId};

/// How long a notification stays on screen unless the sink overrides it.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind { Success, Info, Warning, Error }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub ttl: Duration,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self { Self { message: message.into(), kind, ttl: NOTIFICATION_TTL } }
    pub fn success(message: impl Into<String>) -> Self { Self::new(NotificationKind::Success, message) }
    pub fn info(message: impl Into<String>) -> Self { Self::new(NotificationKind::Info, message) }
    pub fn warning(message: impl Into<String>) -> Self { Self::new(NotificationKind::Warning, message) }
    pub fn error(message: impl Into<String>) -> Self { Self::new(NotificationKind::Error, message) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Cart(CartEvent),
    Draft(DraftEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    QuantityChanged { product_id: ProductId, quantity: u32 },
    ItemRemoved { product_id: ProductId },
    Cleared,
    SelectionChanged { selected: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftEvent {
    Created { draft_id: DraftId },
    Closed { draft_id: DraftId },
    Activated { draft_id: DraftId },
    Updated { draft_id: DraftId },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Submitting { origin: CheckoutOrigin },
    Placed { origin: CheckoutOrigin, order_id: String, total: Decimal },
    Failed { origin: CheckoutOrigin, message: String },
}

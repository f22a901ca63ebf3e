//! Shared fixtures for unit tests

use std::sync::{Arc, Mutex};
use rust_decimal::Decimal;
use crate::domain::aggregates::{CustomerInfo, ProductRef};
use crate::domain::events::{Notification, NotificationKind};
use crate::ports::NotificationSink;
use crate::services::Notifier;

pub fn product(id: &str, price: i64, stock: u32) -> ProductRef {
    ProductRef::new(id, format!("Product {id}"), Decimal::new(price, 0), stock)
}

pub fn customer() -> CustomerInfo { CustomerInfo::new("Nguyen Van A", "0900000000") }

/// Keeps every notification so tests can assert on what the user saw.
#[derive(Default)]
pub struct RecordingSink { seen: Mutex<Vec<Notification>> }

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> { self.seen.lock().unwrap().iter().map(|n| n.message.clone()).collect() }
    pub fn kinds(&self) -> Vec<NotificationKind> { self.seen.lock().unwrap().iter().map(|n| n.kind).collect() }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) { self.seen.lock().unwrap().push(notification); }
}

pub fn recording_notifier() -> (Notifier, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (Notifier::new(sink.clone()), sink)
}

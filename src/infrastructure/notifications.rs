//! Notification sink that writes to the log

use tracing::{error, info, warn};
use crate::domain::events::{Notification, NotificationKind};
use crate::ports::NotificationSink;

/// Used when no UI is attached to receive notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: Notification) {
        let ttl_ms = n.ttl.as_millis() as u64;
        match n.kind {
            NotificationKind::Success | NotificationKind::Info => info!(ttl_ms, "{}", n.message),
            NotificationKind::Warning => warn!(ttl_ms, "{}", n.message),
            NotificationKind::Error => error!(ttl_ms, "{}", n.message),
        }
    }
}

//! Notification fan-out: user feedback plus domain event subscribers

use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{trace, warn};
use crate::domain::events::{DomainEvent, Notification};
use crate::ports::NotificationSink;
use crate::StorefrontError;

const EVENT_BUFFER: usize = 64;

#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    events: broadcast::Sender<DomainEvent>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { sink, events }
    }

    /// Subscribers that fall more than `EVENT_BUFFER` events behind see `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> { self.events.subscribe() }

    pub fn notify(&self, notification: Notification) { self.sink.notify(notification) }

    pub fn publish(&self, event: DomainEvent) {
        if self.events.send(event).is_err() { trace!("no domain event subscribers"); }
    }

    /// Surfaces an error to the user; the caller still returns it.
    pub fn report(&self, err: &StorefrontError) {
        warn!(error = %err, "operation failed");
        self.sink.notify(Notification::error(err.to_string()));
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").field("subscribers", &self.events.receiver_count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{CartEvent, NotificationKind};
    use crate::ports::MockNotificationSink;

    #[test]
    fn test_report_sends_error_notification() {
        let mut sink = MockNotificationSink::new();
        sink.expect_notify()
            .withf(|n| n.kind == NotificationKind::Error && n.message == "Sign in required")
            .times(1)
            .return_const(());
        let notifier = Notifier::new(Arc::new(sink));
        notifier.report(&StorefrontError::Unauthenticated);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let notifier = Notifier::new(Arc::new(MockNotificationSink::new()));
        notifier.publish(DomainEvent::Cart(CartEvent::Cleared));
        let mut rx = notifier.subscribe();
        notifier.publish(DomainEvent::Cart(CartEvent::SelectionChanged { selected: 2 }));
        assert_eq!(rx.recv().await.unwrap(), DomainEvent::Cart(CartEvent::SelectionChanged { selected: 2 }));
    }
}

//! Database change notifications over NATS
//!
//! Rows changing in `products` or `customers` make cached search results
//! stale, so the matching results are dropped from every draft.

use std::sync::Arc;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::services::{PosSession, SearchKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

/// Returns which search cache, if any, was invalidated.
pub fn apply_change(session: &mut PosSession, event: &ChangeEvent) -> Option<SearchKind> {
    let kind = match event.table.as_str() {
        "products" => SearchKind::Products,
        "customers" => SearchKind::Customers,
        _ => return None,
    };
    session.drafts.invalidate_search(kind);
    Some(kind)
}

/// Runs until the subscription ends.
pub async fn run(client: async_nats::Client, subject: String, session: Arc<Mutex<PosSession>>) -> anyhow::Result<()> {
    let mut subscriber = client.subscribe(subject.clone()).await?;
    info!(%subject, "listening for catalog changes");
    while let Some(message) = subscriber.next().await {
        let event: ChangeEvent = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(e) => { warn!(error = %e, "ignoring malformed change event"); continue; }
        };
        let invalidated = apply_change(&mut *session.lock().await, &event);
        debug!(table = %event.table, kind = ?event.kind, ?invalidated, "change applied");
    }
    info!(%subject, "change feed closed");
    Ok(())
}

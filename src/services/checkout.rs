//! Checkout submission pipeline
//!
//! ```text
//! prepare_*  validate, snapshot payload, source -> Submitting   (local, no I/O)
//! place      resolve acting user, call order placement once     (external)
//! complete_* success: retire draft / clear cart selection
//!            failure: source -> Open, error surfaced verbatim
//! ```
//!
//! `submit_cart` and `submit_draft` run all three steps back to back. Hosts
//! that share the session between requests call the steps separately so no
//! lock is held across the external call. Rapid double submits are not
//! deduplicated here; that is left to the order backend.

use std::sync::Arc;
use tracing::{info, warn};
use crate::domain::aggregates::{
    CheckoutOrigin, CheckoutPayload, CustomerInfo, OrderSource, PaymentMethod, PendingCheckout, PlacedOrder, SubmissionState,
};
use crate::domain::events::{DomainEvent, Notification, OrderEvent};
use crate::ports::{IdentityProvider, OrderPlacement};
use crate::services::{CartSession, DraftManager, Notifier};
use crate::{Result, StorefrontError};

/// Customer details entered at cart checkout.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct CartCheckout {
    pub customer: CustomerInfo,
    #[serde(default = "cart_payment_default")]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub note: Option<String>,
}

fn cart_payment_default() -> PaymentMethod { PaymentMethod::Cod }

pub struct CheckoutPipeline {
    orders: Arc<dyn OrderPlacement>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Notifier,
    currency: String,
}

impl CheckoutPipeline {
    pub fn new(orders: Arc<dyn OrderPlacement>, identity: Arc<dyn IdentityProvider>, notifier: Notifier, currency: impl Into<String>) -> Self {
        Self { orders, identity, notifier, currency: currency.into() }
    }

    pub fn prepare_cart(&self, session: &mut CartSession, checkout: CartCheckout) -> Result<PendingCheckout> {
        let built = CheckoutPayload::build(
            &checkout.customer, session.cart().selected_items(), checkout.payment_method, OrderSource::Website, checkout.note, &self.currency,
        );
        let payload = self.reported(built)?;
        session.set_checkout_state(SubmissionState::Submitting);
        Ok(self.pending(CheckoutOrigin::Cart, payload))
    }

    pub fn prepare_draft(&self, drafts: &mut DraftManager) -> Result<PendingCheckout> {
        let draft = drafts.active();
        let built = draft.validate().and_then(|()| CheckoutPayload::build(
            draft.customer(), draft.items(), draft.payment_method(), draft.source(), draft.note().map(str::to_string), &self.currency,
        ));
        let payload = self.reported(built)?;
        let id = draft.id();
        drafts.mark(id, SubmissionState::Submitting);
        Ok(self.pending(CheckoutOrigin::Draft(id), payload))
    }

    /// Calls the order backend exactly once for this attempt.
    pub async fn place(&self, pending: &PendingCheckout) -> Result<PlacedOrder> {
        let actor = self.identity.current_user().await?.ok_or(StorefrontError::Unauthenticated)?;
        if let CheckoutOrigin::Draft(_) = pending.origin {
            let role = self.identity.role(&actor.id).await?;
            if !role.is_staff() { return Err(StorefrontError::Forbidden(role)); }
        }
        let payload = pending.payload.clone().with_actor(actor.id);
        self.orders.place_order(&payload).await
    }

    pub fn complete_cart(&self, session: &mut CartSession, pending: &PendingCheckout, outcome: Result<PlacedOrder>) -> Result<PlacedOrder> {
        session.set_checkout_state(SubmissionState::Open);
        let order = self.settle(pending, outcome)?;
        // Purchased lines stay in the cart; only the selection is retired.
        session.clear_selection();
        Ok(order)
    }

    pub fn complete_draft(&self, drafts: &mut DraftManager, pending: &PendingCheckout, outcome: Result<PlacedOrder>) -> Result<PlacedOrder> {
        let CheckoutOrigin::Draft(id) = pending.origin else {
            return Err(StorefrontError::Validation("Checkout did not come from an order draft".into()));
        };
        if outcome.is_err() {
            drafts.mark(id, SubmissionState::Open);
        }
        let order = self.settle(pending, outcome)?;
        if drafts.get(id).is_some() {
            drafts.close_draft(id)?;
        }
        Ok(order)
    }

    pub async fn submit_cart(&self, session: &mut CartSession, checkout: CartCheckout) -> Result<PlacedOrder> {
        let pending = self.prepare_cart(session, checkout)?;
        let outcome = self.place(&pending).await;
        self.complete_cart(session, &pending, outcome)
    }

    pub async fn submit_draft(&self, drafts: &mut DraftManager) -> Result<PlacedOrder> {
        let pending = self.prepare_draft(drafts)?;
        let outcome = self.place(&pending).await;
        self.complete_draft(drafts, &pending, outcome)
    }

    fn pending(&self, origin: CheckoutOrigin, payload: CheckoutPayload) -> PendingCheckout {
        info!(?origin, items = payload.items.len(), total = %payload.total, "submitting order");
        self.notifier.publish(DomainEvent::Order(OrderEvent::Submitting { origin }));
        PendingCheckout { origin, payload }
    }

    fn settle(&self, pending: &PendingCheckout, outcome: Result<PlacedOrder>) -> Result<PlacedOrder> {
        let origin = pending.origin;
        match outcome {
            Ok(order) => {
                info!(?origin, order_id = %order.order_id, total = %pending.payload.total, "order placed");
                self.notifier.notify(Notification::success(format!("Order {} placed", order.order_id)));
                self.notifier.publish(DomainEvent::Order(OrderEvent::Placed {
                    origin, order_id: order.order_id.clone(), total: pending.payload.total.amount(),
                }));
                Ok(order)
            }
            Err(err) => {
                warn!(?origin, error = %err, "order placement failed");
                self.notifier.report(&err);
                self.notifier.publish(DomainEvent::Order(OrderEvent::Failed { origin, message: err.to_string() }));
                Err(err)
            }
        }
    }

    fn reported<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result { self.notifier.report(err); }
        result
    }
}

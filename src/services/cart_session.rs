//! Durable cart for one device session

use std::sync::Arc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use crate::domain::aggregates::{Cart, LineItem, ProductRef, QuantityChange, SubmissionState};
use crate::domain::events::{CartEvent, DomainEvent, Notification};
use crate::domain::value_objects::ProductId;
use crate::ports::LocalStore;
use crate::services::Notifier;
use crate::{Result, StorefrontError};

/// Key the cart is stored under unless configured otherwise.
pub const CART_KEY: &str = "cart";

const STORAGE_UNAVAILABLE: &str = "Cart could not be saved on this device";

/// Owns the cart, writes it through to local storage after every mutation and
/// reports each outcome to the notifier.
///
/// When storage fails the session keeps going in memory only.
pub struct CartSession {
    cart: Cart,
    store: Arc<dyn LocalStore>,
    key: String,
    durable: bool,
    checkout: SubmissionState,
    notifier: Notifier,
}

impl CartSession {
    pub fn load(store: Arc<dyn LocalStore>, key: impl Into<String>, notifier: Notifier) -> Self {
        let key = key.into();
        let (cart, durable, reset) = match store.load(&key) {
            Ok(Some(bytes)) => match Cart::from_bytes(&bytes) {
                Ok(cart) => { info!(key = %key, lines = cart.line_count(), "restored cart"); (cart, true, false) }
                Err(err) => {
                    // The store works; the stale bytes get overwritten below.
                    warn!(key = %key, error = %err, "stored cart unreadable, starting empty");
                    notifier.notify(Notification::warning("Your saved cart could not be restored"));
                    (Cart::new(), true, true)
                }
            },
            Ok(None) => { debug!(key = %key, "no stored cart, starting empty"); (Cart::new(), true, false) }
            Err(err) => {
                warn!(key = %key, error = %err, "cart storage unavailable, keeping cart in memory");
                notifier.notify(Notification::warning(STORAGE_UNAVAILABLE));
                (Cart::new(), false, false)
            }
        };
        let mut session = Self { cart, store, key, durable, checkout: SubmissionState::Open, notifier };
        if reset { session.persist(); }
        session
    }

    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn is_durable(&self) -> bool { self.durable }
    pub fn checkout_state(&self) -> SubmissionState { self.checkout }
    pub fn notifier(&self) -> &Notifier { &self.notifier }
    pub fn selected_total(&self) -> Decimal { self.cart.selected_total() }

    pub fn add(&mut self, product: &ProductRef, quantity: u32) -> Result<QuantityChange> {
        let result = self.cart.add(product, quantity);
        let change = self.settle(result)?;
        self.announce_quantity(&product.id, &product.name, change, "Added to cart");
        Ok(change)
    }

    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<QuantityChange> {
        let result = self.cart.set_quantity(product_id, quantity);
        let change = self.settle(result)?;
        let name = self.line_name(product_id);
        self.announce_quantity(product_id, &name, change, "Quantity updated");
        Ok(change)
    }

    pub fn increment(&mut self, product_id: &ProductId) -> Result<QuantityChange> {
        let result = self.cart.increment(product_id);
        let change = self.settle(result)?;
        let name = self.line_name(product_id);
        self.announce_quantity(product_id, &name, change, "Quantity updated");
        Ok(change)
    }

    pub fn decrement(&mut self, product_id: &ProductId) -> Result<QuantityChange> {
        let result = self.cart.decrement(product_id);
        let change = self.settle(result)?;
        if let QuantityChange::Set(_) = change {
            let name = self.line_name(product_id);
            self.announce_quantity(product_id, &name, change, "Quantity updated");
        }
        Ok(change)
    }

    pub fn remove(&mut self, product_id: &ProductId) -> Option<LineItem> {
        let removed = self.cart.remove(product_id)?;
        self.persist();
        self.notifier.notify(Notification::success(format!("Removed {} from cart", removed.product_name)));
        self.notifier.publish(DomainEvent::Cart(CartEvent::ItemRemoved { product_id: product_id.clone() }));
        Some(removed)
    }

    pub fn clear(&mut self) {
        let removed = self.cart.clear();
        self.persist();
        info!(lines = removed, "cart cleared");
        self.notifier.notify(Notification::success("Cart cleared"));
        self.notifier.publish(DomainEvent::Cart(CartEvent::Cleared));
    }

    pub fn select(&mut self, product_id: &ProductId) -> Result<()> {
        let result = self.cart.select(product_id);
        if let Err(err) = result { self.notifier.report(&err); return Err(err); }
        self.selection_changed();
        Ok(())
    }

    pub fn deselect(&mut self, product_id: &ProductId) -> bool {
        let changed = self.cart.deselect(product_id);
        if changed { self.selection_changed(); }
        changed
    }

    pub fn select_all(&mut self) { self.cart.select_all(); self.selection_changed(); }
    pub fn deselect_all(&mut self) { self.cart.deselect_all(); self.selection_changed(); }

    pub(crate) fn set_checkout_state(&mut self, state: SubmissionState) { self.checkout = state; }

    pub(crate) fn clear_selection(&mut self) { self.cart.deselect_all(); self.selection_changed(); }

    fn selection_changed(&self) {
        self.notifier.publish(DomainEvent::Cart(CartEvent::SelectionChanged { selected: self.cart.selection().len() }));
    }

    /// Persists on success; reports and passes through on failure.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => { self.persist(); Ok(value) }
            Err(err) => { self.notifier.report(&err); Err(err) }
        }
    }

    fn persist(&mut self) {
        if !self.durable { return; }
        if let Err(err) = self.cart.to_bytes().and_then(|bytes| self.store.save(&self.key, &bytes)) {
            warn!(key = %self.key, error = %err, "failed to persist cart, continuing in memory");
            self.durable = false;
            self.notifier.notify(Notification::warning(STORAGE_UNAVAILABLE));
        }
    }

    fn announce_quantity(&self, product_id: &ProductId, name: &str, change: QuantityChange, verb: &str) {
        let notification = match change {
            QuantityChange::Clamped { requested, applied } if requested > applied => {
                let err = StorefrontError::InsufficientStock { product_id: product_id.clone(), name: name.to_string(), requested, available: applied };
                Notification::warning(err.to_string())
            }
            _ => Notification::success(format!("{verb}: {name}")),
        };
        self.notifier.notify(notification);
        self.notifier.publish(DomainEvent::Cart(CartEvent::QuantityChanged { product_id: product_id.clone(), quantity: change.quantity() }));
    }

    fn line_name(&self, product_id: &ProductId) -> String {
        self.cart.items().find_product(product_id).map(|l| l.product_name.clone()).unwrap_or_else(|| product_id.to_string())
    }
}

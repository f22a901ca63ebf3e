//! Stateful services built on the aggregates
pub mod cart_session;
pub mod checkout;
pub mod draft_manager;
pub mod notifier;

pub use cart_session::{CartSession, CART_KEY};
pub use checkout::{CartCheckout, CheckoutPipeline};
pub use draft_manager::{DraftManager, SearchKind, SearchTicket};
pub use notifier::Notifier;

/// Everything one device owns: the shopper's cart and the staff's open drafts.
pub struct PosSession {
    pub cart: CartSession,
    pub drafts: DraftManager,
}

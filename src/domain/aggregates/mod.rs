//! Aggregates module
pub mod product;
pub mod line_items;
pub mod selection;
pub mod cart;
pub mod draft;
pub mod order;

pub use product::ProductRef;
pub use line_items::{LineItem, LineItems, QuantityChange};
pub use selection::Selection;
pub use cart::Cart;
pub use draft::{CustomerInfo, CustomerRecord, DraftDefaults, DraftPatch, OrderDraft, SearchResults};
pub use order::{CheckoutOrigin, CheckoutPayload, OrderSource, PayloadItem, PaymentMethod, PendingCheckout, PlacedOrder, SubmissionState};

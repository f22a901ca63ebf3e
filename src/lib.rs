//! OpenSASE Storefront
//!
//! Cart and point-of-sale order composer for the self-hosted storefront.
//!
//! ## Features
//! - Durable shopping cart with stock-aware quantities
//! - Selection-based cart checkout
//! - Multi-tab order drafts for staff at the till
//! - Checkout pipeline over pluggable order placement backends
//! - HTTP host for a single device session

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod services;

#[cfg(test)]
mod test_support;

use thiserror::Error;

pub use domain::aggregates::{
    Cart, CheckoutPayload, CustomerInfo, LineItem, LineItems, OrderDraft, OrderSource,
    PaymentMethod, PlacedOrder, ProductRef, QuantityChange,
};
pub use domain::value_objects::{DraftId, LineId, Money, ProductId};
pub use ports::Role;
pub use services::{CartSession, CheckoutPipeline, DraftManager, Notifier, PosSession};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{name} is out of stock")]
    OutOfStock { product_id: ProductId, name: String },

    #[error("Only {available} of {name} in stock (requested {requested})")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Line item not found: {0}")]
    LineNotFound(String),

    #[error("Order draft not found: {0}")]
    DraftNotFound(DraftId),

    #[error("{0}")]
    Validation(String),

    /// Rejection from the order placement backend, kept verbatim.
    #[error("{0}")]
    Business(String),

    #[error("Search failed: {0}")]
    Query(String),

    #[error("Sign in required")]
    Unauthenticated,

    #[error("Role {0} cannot place point-of-sale orders")]
    Forbidden(Role),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

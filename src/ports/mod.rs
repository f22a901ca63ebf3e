//! Collaborator contracts consumed by the engine
//!
//! Everything behind these traits (identity, catalog, customers, order
//! placement, local storage, notifications) lives outside the crate's core.
//! Adapters are in [`crate::infrastructure`].

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::aggregates::{CheckoutPayload, CustomerRecord, PlacedOrder, ProductRef};
use crate::domain::events::Notification;
use crate::Result;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { User, Staff, Admin }

impl Role {
    pub fn is_staff(&self) -> bool { matches!(self, Self::Staff | Self::Admin) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::User => write!(f, "user"), Self::Staff => write!(f, "staff"), Self::Admin => write!(f, "admin") }
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    async fn current_user(&self) -> Result<Option<User>>;

    /// Fails with `Unauthenticated` when the user has no profile.
    async fn role(&self, user_id: &str) -> Result<Role>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn search_products(&self, term: &str, limit: usize) -> Result<Vec<ProductRef>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CustomerLookup: Send + Sync {
    async fn search_customers(&self, term: &str, limit: usize) -> Result<Vec<CustomerRecord>>;
}

/// Atomic order creation with stock decrement, run by the backend.
///
/// Rejections come back as `StorefrontError::Business` carrying the backend's
/// message.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrderPlacement: Send + Sync {
    async fn place_order(&self, payload: &CheckoutPayload) -> Result<PlacedOrder>;
}

/// Durable key/value storage local to the device.
#[cfg_attr(test, automock)]
pub trait LocalStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Fire-and-forget user feedback.
#[cfg_attr(test, automock)]
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

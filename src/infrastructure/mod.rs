//! Adapters implementing the collaborator ports
pub mod change_feed;
pub mod edge_function;
pub mod local_store;
pub mod notifications;
pub mod postgres;

pub use edge_function::EdgeFunctionOrders;
pub use local_store::{FileStore, MemoryStore};
pub use notifications::TracingSink;
pub use postgres::{PgCatalog, PgIdentity, PgOrderProcedure};

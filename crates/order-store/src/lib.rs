//! Order Store: persisted order records keyed by order id.
//!
//! Records are stored in the flat scalar layout of [`domain::OrderRecord`].
//! Updates only ever touch the status, deliverer and timestamp columns.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;

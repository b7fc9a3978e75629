//! Domain layer for the order saga.
//!
//! This crate provides:
//! - Value objects shared by orders and collaborators (ids, money, roles)
//! - The `Order` record and its status state machine
//! - The flat `OrderRecord` layout used by order stores
//! - `Aggregate`/`DomainEvent` traits for event-sourced reducers

pub mod aggregate;
pub mod error;
pub mod order;
pub mod value_objects;

pub use aggregate::{Aggregate, DomainEvent};
pub use error::OrderError;
pub use order::{CreateOrder, Order, OrderRecord, OrderStatus, Payout, order_amount};
pub use value_objects::{Money, ProductId, Role, UserId, WalletId};

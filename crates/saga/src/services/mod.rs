//! Collaborator contracts and in-memory implementations.
//!
//! Inventory, funds and identity are owned by other services; the saga only
//! sees them through these traits.

pub mod funds;
pub mod identity;
pub mod inventory;

pub use funds::{FundsService, InMemoryFundsService, Wallet};
pub use identity::{IdentityService, InMemoryIdentityService, User};
pub use inventory::{InMemoryInventoryService, InventoryService, Product, ProductUpdate};

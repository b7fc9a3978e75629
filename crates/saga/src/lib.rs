//! Order saga: synchronous orchestration and durable execution.
//!
//! An order moves `Placed → Accepted → Delivering → Delivered` across three
//! independently owned resources (inventory, funds and the order record)
//! with no shared transaction. Two drivers run the lifecycle:
//!
//! - [`OrderCoordinator`] performs each transition as a single call.
//! - The durable saga in [`workflow`] is started once and advanced by
//!   signals, journaling every step so it survives restarts.
//!
//! Both drivers validate through the shared [`steps`] library.

pub mod coordinator;
pub mod error;
pub mod services;
pub mod steps;
pub mod workflow;

pub use coordinator::OrderCoordinator;
pub use error::{Result, SagaError};
pub use services::{
    FundsService, IdentityService, InMemoryFundsService, InMemoryIdentityService,
    InMemoryInventoryService, InventoryService, Product, ProductUpdate, User, Wallet,
};
pub use steps::Placement;
pub use workflow::{
    EngineConfig, ExecutionHandle, ExecutionStatus, LocalEngine, OrderActivities, OrderSignal,
    OrderWorkflowService, OrderWorkflowState, StartOrder, WorkflowActivities, WorkflowEngine,
    WorkflowEvent,
};

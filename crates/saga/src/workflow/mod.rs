//! Durable order saga.
//!
//! The saga is started once and then advanced by external signals. Every
//! state change is journaled, and the state is rebuilt by folding the
//! journal through [`OrderWorkflowState`], so an execution survives a
//! process restart and can be queried at any time.

pub mod activities;
pub mod engine;
pub mod events;
pub mod service;
pub mod signals;
pub mod state;

pub use activities::{OrderActivities, WorkflowActivities};
pub use engine::{EngineConfig, ExecutionHandle, LocalEngine, WorkflowEngine};
pub use events::{ExecutionStartedData, WorkflowEvent};
pub use service::OrderWorkflowService;
pub use signals::{
    DEFAULT_TASK_QUEUE, OrderSignal, QUERY_ORDER_BY_ID, SIGNAL_ACCEPT_ORDER,
    SIGNAL_DELIVERED_ORDER, SIGNAL_START_DELIVERY, StartOrder,
};
pub use state::{ExecutionStatus, OrderWorkflowState};

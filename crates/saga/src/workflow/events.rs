//! Journaled workflow events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{DomainEvent, Payout};
use serde::{Deserialize, Serialize};

use crate::services::Wallet;
use crate::steps::Placement;
use crate::workflow::signals::StartOrder;

/// Everything that can happen to an order execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkflowEvent {
    ExecutionStarted(ExecutionStartedData),

    /// Inventory and funds were validated against the start snapshots.
    OrderPlaced(Placement),

    OrderAccepted { at: DateTime<Utc> },

    DeliveryStarted {
        deliverer_wallet: Wallet,
        at: DateTime<Utc>,
    },

    OrderDelivered { at: DateTime<Utc> },

    /// The execution's effects were committed to inventory and funds.
    Settled { payout: Payout },

    ExecutionCompleted { at: DateTime<Utc> },

    ExecutionFailed { reason: String, at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStartedData {
    pub execution_id: AggregateId,
    pub task_queue: String,
    pub input: StartOrder,
    pub started_at: DateTime<Utc>,
}

impl DomainEvent for WorkflowEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::ExecutionStarted(_) => "ExecutionStarted",
            WorkflowEvent::OrderPlaced(_) => "OrderPlaced",
            WorkflowEvent::OrderAccepted { .. } => "OrderAccepted",
            WorkflowEvent::DeliveryStarted { .. } => "DeliveryStarted",
            WorkflowEvent::OrderDelivered { .. } => "OrderDelivered",
            WorkflowEvent::Settled { .. } => "Settled",
            WorkflowEvent::ExecutionCompleted { .. } => "ExecutionCompleted",
            WorkflowEvent::ExecutionFailed { .. } => "ExecutionFailed",
        }
    }
}

impl WorkflowEvent {
    pub fn failed(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        WorkflowEvent::ExecutionFailed {
            reason: reason.into(),
            at,
        }
    }
}

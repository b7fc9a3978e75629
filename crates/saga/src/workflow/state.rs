//! Order execution state, rebuilt by folding the journal.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Order, OrderError, OrderStatus, Payout};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};
use crate::services::{Product, Wallet};
use crate::workflow::events::WorkflowEvent;
use crate::workflow::signals::OrderSignal;

/// Lifecycle of an execution, independent of the order status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum ExecutionStatus {
    #[default]
    NotStarted,
    Running,
    Completed,
    Failed(String),
}

/// Point-in-time view of an order execution.
///
/// The snapshots of product and wallets are the execution's own values:
/// they are authoritative until the execution settles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderWorkflowState {
    id: Option<AggregateId>,
    version: Version,
    task_queue: String,
    started_at: Option<DateTime<Utc>>,
    order: Option<Order>,
    product: Option<Product>,
    customer_wallet: Option<Wallet>,
    seller_wallet: Option<Wallet>,
    deliverer_wallet: Option<Wallet>,
    payout: Option<Payout>,
    execution: ExecutionStatus,
}

impl Aggregate for OrderWorkflowState {
    type Event = WorkflowEvent;

    fn aggregate_type() -> &'static str {
        "OrderWorkflow"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            WorkflowEvent::ExecutionStarted(data) => {
                self.id = Some(data.execution_id);
                self.task_queue = data.task_queue;
                self.started_at = Some(data.started_at);
                self.product = Some(data.input.product);
                self.customer_wallet = Some(data.input.customer_wallet);
                self.seller_wallet = Some(data.input.seller_wallet);
                self.execution = ExecutionStatus::Running;
            }
            WorkflowEvent::OrderPlaced(placement) => {
                self.order = Some(placement.order);
                self.product = Some(placement.product);
                self.customer_wallet = Some(placement.customer_wallet);
            }
            WorkflowEvent::OrderAccepted { at } => {
                self.transition(|order| order.accept(at));
            }
            WorkflowEvent::DeliveryStarted {
                deliverer_wallet,
                at,
            } => {
                let deliverer_id = deliverer_wallet.user_id;
                self.deliverer_wallet = Some(deliverer_wallet);
                self.transition(|order| order.start_delivery(deliverer_id, at));
            }
            WorkflowEvent::OrderDelivered { at } => {
                self.transition(|order| order.mark_delivered(at));
            }
            WorkflowEvent::Settled { payout } => {
                self.payout = Some(payout);
            }
            WorkflowEvent::ExecutionCompleted { .. } => {
                self.execution = ExecutionStatus::Completed;
            }
            WorkflowEvent::ExecutionFailed { reason, .. } => {
                self.execution = ExecutionStatus::Failed(reason);
            }
        }
        self.version = self.version.next();
    }
}

impl OrderWorkflowState {
    /// Rebuilds a state from its events.
    pub fn replay(events: impl IntoIterator<Item = WorkflowEvent>) -> Self {
        let mut state = Self::default();
        state.apply_events(events);
        state
    }

    /// Decides the events a signal produces at the current wait point.
    ///
    /// Each signal is only valid at its own wait point and with its expected
    /// value; anything else is an `InvalidTransition`.
    pub fn decide(&self, signal: &OrderSignal, now: DateTime<Utc>) -> Result<Vec<WorkflowEvent>> {
        let id = self.id.unwrap_or_default();
        if !self.is_running() {
            return Err(SagaError::ExecutionClosed(id));
        }
        let order = self
            .order
            .as_ref()
            .ok_or_else(|| SagaError::not_found("order", id))?;

        let at_wait_point = |waiting_for: OrderStatus, posted: OrderStatus| {
            if order.status() == waiting_for && order.status().next() == Some(posted) {
                Ok(())
            } else {
                Err(SagaError::InvalidTransition {
                    current: order.status(),
                    action: signal.name(),
                })
            }
        };

        let event = match signal {
            OrderSignal::AcceptOrder { status } => {
                at_wait_point(OrderStatus::Placed, *status)?;
                WorkflowEvent::OrderAccepted { at: now }
            }
            OrderSignal::StartDelivery { deliverer_wallet } => {
                at_wait_point(OrderStatus::Accepted, OrderStatus::Delivering)?;
                WorkflowEvent::DeliveryStarted {
                    deliverer_wallet: deliverer_wallet.clone(),
                    at: now,
                }
            }
            OrderSignal::DeliveredOrder { status } => {
                at_wait_point(OrderStatus::Delivering, *status)?;
                WorkflowEvent::OrderDelivered { at: now }
            }
        };
        Ok(vec![event])
    }

    /// Applies an order transition; a transition the journal should never
    /// contain fails the execution instead of panicking.
    fn transition(&mut self, step: impl FnOnce(&mut Order) -> std::result::Result<(), OrderError>) {
        let outcome = match self.order.as_mut() {
            Some(order) => step(order).map_err(|e| e.to_string()),
            None => Err("no order placed".to_string()),
        };
        if let Err(reason) = outcome {
            self.execution = ExecutionStatus::Failed(format!("inconsistent journal: {reason}"));
        }
    }

    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Order status, once the order has been placed.
    pub fn status(&self) -> Option<OrderStatus> {
        self.order.as_ref().map(Order::status)
    }

    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    pub fn customer_wallet(&self) -> Option<&Wallet> {
        self.customer_wallet.as_ref()
    }

    pub fn seller_wallet(&self) -> Option<&Wallet> {
        self.seller_wallet.as_ref()
    }

    pub fn deliverer_wallet(&self) -> Option<&Wallet> {
        self.deliverer_wallet.as_ref()
    }

    pub fn payout(&self) -> Option<Payout> {
        self.payout
    }

    pub fn execution(&self) -> &ExecutionStatus {
        &self.execution
    }

    pub fn is_running(&self) -> bool {
        self.execution == ExecutionStatus::Running
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.execution {
            ExecutionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// True once delivery is confirmed but the effects are not yet committed.
    pub fn needs_settlement(&self) -> bool {
        self.is_running() && self.status() == Some(OrderStatus::Delivered) && self.payout.is_none()
    }
}

//! Saga error types.

use common::AggregateId;
use domain::{Money, OrderError, OrderStatus, ProductId, Role, UserId};
use event_store::EventStoreError;
use order_store::OrderStoreError;
use thiserror::Error;

/// Errors surfaced by the orchestrator, the durable saga and collaborators.
#[derive(Debug, Error)]
pub enum SagaError {
    /// An order, product, wallet or user does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The order is not in the status the action requires.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },

    #[error(
        "Insufficient inventory for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientInventory {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("Insufficient funds for user {user_id}: required {required}, available {available}")]
    InsufficientFunds {
        user_id: UserId,
        required: Money,
        available: Money,
    },

    /// The acting user does not hold the role the action requires.
    #[error("User {user_id} is not a {required}")]
    Forbidden { user_id: UserId, required: Role },

    /// A negative amount, or a price whose total is out of range.
    #[error("Invalid amount: {0}")]
    InvalidAmount(Money),

    #[error("Invalid quantity: {0} (must be greater than 0)")]
    InvalidQuantity(i64),

    /// A collaborator call failed.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Order store error: {0}")]
    OrderStore(#[from] OrderStoreError),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Workflow execution not found: {0}")]
    ExecutionNotFound(AggregateId),

    #[error("Workflow execution already started: {0}")]
    ExecutionAlreadyStarted(AggregateId),

    /// The execution has completed or failed and accepts no more signals.
    #[error("Workflow execution is closed: {0}")]
    ExecutionClosed(AggregateId),

    #[error("Unknown query: {0}")]
    UnknownQuery(String),
}

impl SagaError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SagaError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for errors caused by the request rather than by infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SagaError::NotFound { .. }
                | SagaError::InvalidTransition { .. }
                | SagaError::InsufficientInventory { .. }
                | SagaError::InsufficientFunds { .. }
                | SagaError::Forbidden { .. }
                | SagaError::InvalidAmount(_)
                | SagaError::InvalidQuantity(_)
        )
    }
}

impl From<OrderError> for SagaError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { current, action } => {
                SagaError::InvalidTransition { current, action }
            }
            OrderError::InvalidQuantity { quantity } => SagaError::InvalidQuantity(quantity),
            OrderError::InvalidAmount { unit_price, .. } => SagaError::InvalidAmount(unit_price),
            OrderError::UnknownStatus(_) => SagaError::OrderStore(OrderStoreError::Corrupt(err)),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;
use crate::value_objects::Money;

/// Errors raised by order rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The order is not in the state the action requires.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Quantity must be a positive integer.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i64 },

    /// The price is negative or the total does not fit in an amount.
    #[error("Invalid order amount: {unit_price} x {quantity} + {delivery_cost}")]
    InvalidAmount {
        unit_price: Money,
        delivery_cost: Money,
        quantity: u32,
    },

    /// A persisted status code does not map to any status.
    #[error("Unknown order status code: {0}")]
    UnknownStatus(i32),
}

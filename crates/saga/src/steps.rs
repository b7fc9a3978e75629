//! Saga steps shared by the synchronous orchestrator and the durable saga.
//!
//! Each step validates against a snapshot and returns the mutated snapshot;
//! the callers decide when and how the effects reach collaborators.

use chrono::{DateTime, Utc};
use domain::{CreateOrder, Money, Order, OrderStatus, Role};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};
use crate::services::{Product, User, Wallet};

pub const STEP_PLACE_ORDER: &str = "place_order";
pub const STEP_ACCEPT_ORDER: &str = "accept_order";
pub const STEP_START_DELIVERY: &str = "start_delivery";
pub const STEP_CONFIRM_DELIVERY: &str = "confirm_delivery";
pub const STEP_CANCEL_ORDER: &str = "cancel_order";
pub const STEP_SETTLE: &str = "settle";

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub order: Order,
    /// The product with the ordered quantity taken out.
    pub product: Product,
    /// The customer wallet with the amount taken out.
    pub customer_wallet: Wallet,
}

/// Prices an order against the current product record.
///
/// The product must belong to the named seller and have enough stock.
pub fn price(cmd: &CreateOrder, product: &Product, now: DateTime<Utc>) -> Result<Order> {
    if product.id != cmd.product_id || product.seller_id != cmd.seller_id {
        return Err(SagaError::not_found("product", cmd.product_id));
    }
    if cmd.quantity == 0 {
        return Err(SagaError::InvalidQuantity(0));
    }
    if cmd.quantity > product.quantity {
        return Err(SagaError::InsufficientInventory {
            product_id: product.id,
            requested: cmd.quantity,
            available: product.quantity,
        });
    }

    Ok(Order::place(cmd, product.price, product.delivery_cost, now)?)
}

/// Checks that a wallet covers `amount`.
pub fn ensure_funds(wallet: &Wallet, amount: Money) -> Result<()> {
    if wallet.cash < amount {
        return Err(SagaError::InsufficientFunds {
            user_id: wallet.user_id,
            required: amount,
            available: wallet.cash,
        });
    }
    Ok(())
}

/// Validates inventory and funds and applies the order to both snapshots.
pub fn place(
    cmd: &CreateOrder,
    product: &Product,
    customer_wallet: &Wallet,
    now: DateTime<Utc>,
) -> Result<Placement> {
    let order = price(cmd, product, now)?;
    if customer_wallet.user_id != cmd.customer_id {
        return Err(SagaError::not_found("wallet", cmd.customer_id));
    }
    ensure_funds(customer_wallet, order.amount())?;

    let mut product = product.clone();
    product.quantity -= order.quantity();
    let mut customer_wallet = customer_wallet.clone();
    customer_wallet.cash = customer_wallet
        .cash
        .checked_sub(order.amount())
        .ok_or(SagaError::InvalidAmount(order.amount()))?;

    Ok(Placement {
        order,
        product,
        customer_wallet,
    })
}

pub fn require_role(user: &User, required: Role) -> Result<()> {
    if user.role != required {
        return Err(SagaError::Forbidden {
            user_id: user.id,
            required,
        });
    }
    Ok(())
}

/// Fails with `InvalidTransition` unless the order is exactly at `expected`.
pub fn require_status(order: &Order, expected: OrderStatus, action: &'static str) -> Result<()> {
    if order.status() != expected {
        return Err(SagaError::InvalidTransition {
            current: order.status(),
            action,
        });
    }
    Ok(())
}

pub fn require_cancelable(order: &Order) -> Result<()> {
    if !order.can_cancel() {
        return Err(SagaError::InvalidTransition {
            current: order.status(),
            action: "cancel",
        });
    }
    Ok(())
}

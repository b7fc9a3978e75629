//! Execution input, signals and query names.

use common::AggregateId;
use domain::{CreateOrder, OrderStatus, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::services::{Product, Wallet};

pub const DEFAULT_TASK_QUEUE: &str = "OrdersTaskQueue";

pub const QUERY_ORDER_BY_ID: &str = "QueryOrderById";

pub const SIGNAL_ACCEPT_ORDER: &str = "AcceptOrder";
pub const SIGNAL_START_DELIVERY: &str = "StartDelivery";
pub const SIGNAL_DELIVERED_ORDER: &str = "DeliveredOrder";

/// Input of a new execution: the order request plus the snapshots taken
/// when it was started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartOrder {
    pub customer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: Product,
    pub customer_wallet: Wallet,
    pub seller_wallet: Wallet,
}

impl StartOrder {
    /// The order request for an execution; the execution id is the order id.
    pub fn command(&self, execution_id: AggregateId) -> CreateOrder {
        CreateOrder::with_id(
            execution_id,
            self.customer_id,
            self.seller_id,
            self.product_id,
            self.quantity,
        )
    }
}

/// Externally posted events that advance an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "payload")]
pub enum OrderSignal {
    /// Carries the target status, which must be `Accepted`.
    AcceptOrder { status: OrderStatus },

    /// Carries the wallet of the user taking the delivery.
    StartDelivery { deliverer_wallet: Wallet },

    /// Carries the target status, which must be `Delivered`.
    DeliveredOrder { status: OrderStatus },
}

impl OrderSignal {
    pub fn name(&self) -> &'static str {
        match self {
            OrderSignal::AcceptOrder { .. } => SIGNAL_ACCEPT_ORDER,
            OrderSignal::StartDelivery { .. } => SIGNAL_START_DELIVERY,
            OrderSignal::DeliveredOrder { .. } => SIGNAL_DELIVERED_ORDER,
        }
    }

    pub fn accept() -> Self {
        OrderSignal::AcceptOrder {
            status: OrderStatus::Accepted,
        }
    }

    pub fn start_delivery(deliverer_wallet: Wallet) -> Self {
        OrderSignal::StartDelivery { deliverer_wallet }
    }

    pub fn delivered() -> Self {
        OrderSignal::DeliveredOrder {
            status: OrderStatus::Delivered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_wire_shape() {
        let json = serde_json::to_value(OrderSignal::accept()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "signal": "AcceptOrder", "payload": { "status": "Accepted" } })
        );
        assert_eq!(OrderSignal::delivered().name(), "DeliveredOrder");
    }
}

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::value_objects::{ProductId, UserId};

/// Request to place a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    /// Id chosen by the caller; becomes the order id.
    pub order_id: AggregateId,
    pub customer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CreateOrder {
    /// Creates a request with a freshly generated order id.
    pub fn new(
        customer_id: UserId,
        seller_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Self {
        Self::with_id(AggregateId::new(), customer_id, seller_id, product_id, quantity)
    }

    pub fn with_id(
        order_id: AggregateId,
        customer_id: UserId,
        seller_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Self {
        Self {
            order_id,
            customer_id,
            seller_id,
            product_id,
            quantity,
        }
    }
}

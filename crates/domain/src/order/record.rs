use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrderError;
use crate::order::{Order, OrderStatus};
use crate::order::model::validate_quantity;
use crate::value_objects::{Money, ProductId, UserId};

/// Flat persisted form of an order.
///
/// Every field is a plain scalar: ids as UUIDs, status as its integer code,
/// quantity as an integer and money as floating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub deliverer_id: Option<Uuid>,
    pub status: i32,
    pub quantity: i32,
    pub unit_price: f64,
    pub delivery_cost: f64,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_uuid(),
            customer_id: order.customer_id.as_uuid(),
            seller_id: order.seller_id.as_uuid(),
            product_id: order.product_id.as_uuid(),
            deliverer_id: order.deliverer_id.map(|id| id.as_uuid()),
            status: order.status.code(),
            // Quantity is bounded by i32::MAX when the order is placed.
            quantity: order.quantity as i32,
            unit_price: order.unit_price.as_f64(),
            delivery_cost: order.delivery_cost.as_f64(),
            amount: order.amount.as_f64(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = OrderError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(record.quantity).map_err(|_| OrderError::InvalidQuantity {
            quantity: i64::from(record.quantity),
        })?;
        validate_quantity(quantity)?;

        Ok(Order {
            id: AggregateId::from_uuid(record.id),
            customer_id: UserId::from_uuid(record.customer_id),
            seller_id: UserId::from_uuid(record.seller_id),
            product_id: ProductId::from_uuid(record.product_id),
            deliverer_id: record.deliverer_id.map(UserId::from_uuid),
            status: OrderStatus::from_code(record.status)?,
            quantity,
            unit_price: Money::from_f64(record.unit_price),
            delivery_cost: Money::from_f64(record.delivery_cost),
            amount: Money::from_f64(record.amount),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::order::{CreateOrder, OrderStatus};
use crate::value_objects::{Money, ProductId, UserId};

/// Total charged for an order: `unit_price × quantity + delivery_cost`.
///
/// Fails if either price is negative or the total overflows.
pub fn order_amount(
    unit_price: Money,
    delivery_cost: Money,
    quantity: u32,
) -> Result<Money, OrderError> {
    let invalid = || OrderError::InvalidAmount {
        unit_price,
        delivery_cost,
        quantity,
    };
    if unit_price.is_negative() || delivery_cost.is_negative() {
        return Err(invalid());
    }
    unit_price
        .checked_mul(quantity)
        .and_then(|subtotal| subtotal.checked_add(delivery_cost))
        .ok_or_else(invalid)
}

/// A purchase order.
///
/// The amount is fixed when the order is placed and never recomputed.
/// Only the transition methods mutate an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub(crate) id: AggregateId,
    pub(crate) customer_id: UserId,
    pub(crate) seller_id: UserId,
    pub(crate) product_id: ProductId,
    pub(crate) deliverer_id: Option<UserId>,
    pub(crate) status: OrderStatus,
    pub(crate) quantity: u32,
    pub(crate) unit_price: Money,
    pub(crate) delivery_cost: Money,
    pub(crate) amount: Money,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Order {
    /// Places an order priced from the current product record.
    pub fn place(
        cmd: &CreateOrder,
        unit_price: Money,
        delivery_cost: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        validate_quantity(cmd.quantity)?;
        let amount = order_amount(unit_price, delivery_cost, cmd.quantity)?;

        Ok(Self {
            id: cmd.order_id,
            customer_id: cmd.customer_id,
            seller_id: cmd.seller_id,
            product_id: cmd.product_id,
            deliverer_id: None,
            status: OrderStatus::Placed,
            quantity: cmd.quantity,
            unit_price,
            delivery_cost,
            amount,
            created_at: now,
            updated_at: now,
        })
    }

    /// Placed → Accepted.
    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.status = self.status.advance(OrderStatus::Accepted, "accept")?;
        self.updated_at = now;
        Ok(())
    }

    /// Accepted → Delivering, recording who delivers.
    pub fn start_delivery(
        &mut self,
        deliverer_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        self.status = self
            .status
            .advance(OrderStatus::Delivering, "start delivery")?;
        self.deliverer_id = Some(deliverer_id);
        self.updated_at = now;
        Ok(())
    }

    /// Delivering → Delivered.
    pub fn mark_delivered(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.status = self
            .status
            .advance(OrderStatus::Delivered, "confirm delivery")?;
        self.updated_at = now;
        Ok(())
    }

    pub fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }

    /// How the amount is shared once the order is delivered.
    pub fn payout(&self) -> Result<Payout, OrderError> {
        Payout::split(self.unit_price, self.quantity, self.amount)
    }

    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn customer_id(&self) -> UserId {
        self.customer_id
    }

    pub fn seller_id(&self) -> UserId {
        self.seller_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn deliverer_id(&self) -> Option<UserId> {
        self.deliverer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn delivery_cost(&self) -> Money {
        self.delivery_cost
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

pub(crate) fn validate_quantity(quantity: u32) -> Result<(), OrderError> {
    if quantity == 0 || quantity > i32::MAX as u32 {
        return Err(OrderError::InvalidQuantity {
            quantity: i64::from(quantity),
        });
    }
    Ok(())
}

/// Shares of a delivered order's amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// `unit_price × quantity`.
    pub seller: Money,
    /// Whatever remains of the amount (the delivery cost).
    pub deliverer: Money,
}

impl Payout {
    /// Fails if the seller's share is out of range or exceeds `amount`.
    pub fn split(unit_price: Money, quantity: u32, amount: Money) -> Result<Self, OrderError> {
        let invalid = || OrderError::InvalidAmount {
            unit_price,
            delivery_cost: Money::zero(),
            quantity,
        };
        let seller = unit_price.checked_mul(quantity).ok_or_else(invalid)?;
        let deliverer = amount
            .checked_sub(seller)
            .filter(|rest| !seller.is_negative() && !rest.is_negative())
            .ok_or_else(invalid)?;
        Ok(Self { seller, deliverer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(quantity: u32) -> Order {
        let cmd = CreateOrder::new(UserId::new(), UserId::new(), ProductId::new(), quantity);
        Order::place(
            &cmd,
            Money::from_dollars(10),
            Money::from_dollars(2),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_place_computes_amount_once() {
        let order = placed(3);
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.amount(), Money::from_dollars(32));
        assert_eq!(order.deliverer_id(), None);
        assert_eq!(order.created_at(), order.updated_at());
    }

    #[test]
    fn test_place_rejects_zero_quantity() {
        let cmd = CreateOrder::new(UserId::new(), UserId::new(), ProductId::new(), 0);
        let result = Order::place(&cmd, Money::from_dollars(1), Money::zero(), Utc::now());
        assert_eq!(result, Err(OrderError::InvalidQuantity { quantity: 0 }));
    }

    #[test]
    fn test_full_lifecycle() {
        let mut order = placed(1);
        let deliverer = UserId::new();

        order.accept(Utc::now()).unwrap();
        order.start_delivery(deliverer, Utc::now()).unwrap();
        assert_eq!(order.deliverer_id(), Some(deliverer));
        order.mark_delivered(Utc::now()).unwrap();

        assert_eq!(order.status(), OrderStatus::Delivered);
        assert!(!order.can_cancel());
    }

    #[test]
    fn test_rejected_transition_leaves_order_unmodified() {
        let mut order = placed(2);
        let before = order.clone();

        assert!(order.start_delivery(UserId::new(), Utc::now()).is_err());
        assert!(order.mark_delivered(Utc::now()).is_err());
        assert_eq!(order, before);

        order.accept(Utc::now()).unwrap();
        let err = order.accept(Utc::now()).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                current: OrderStatus::Accepted,
                action: "accept"
            }
        );
    }

    #[test]
    fn test_payout_splits_amount_exactly() {
        let order = placed(3);
        let payout = order.payout().unwrap();
        assert_eq!(payout.seller, Money::from_dollars(30));
        assert_eq!(payout.deliverer, Money::from_dollars(2));
        assert_eq!(payout.seller.checked_add(payout.deliverer), Some(order.amount()));
    }

    #[test]
    fn test_place_rejects_amount_overflow() {
        let cmd = CreateOrder::new(UserId::new(), UserId::new(), ProductId::new(), 3);
        let unit_price = Money::from_cents(i64::MAX / 2);
        let result = Order::place(&cmd, unit_price, Money::zero(), Utc::now());
        assert_eq!(
            result,
            Err(OrderError::InvalidAmount {
                unit_price,
                delivery_cost: Money::zero(),
                quantity: 3
            })
        );

        let result = order_amount(Money::from_cents(i64::MAX), Money::from_cents(1), 1);
        assert!(matches!(result, Err(OrderError::InvalidAmount { .. })));
    }

    #[test]
    fn test_place_rejects_negative_prices() {
        let cmd = CreateOrder::new(UserId::new(), UserId::new(), ProductId::new(), 1);
        let result = Order::place(&cmd, Money::from_cents(-100), Money::zero(), Utc::now());
        assert!(matches!(result, Err(OrderError::InvalidAmount { .. })));
    }

    #[test]
    fn test_payout_rejects_share_larger_than_amount() {
        let result = Payout::split(Money::from_dollars(10), 2, Money::from_dollars(15));
        assert!(matches!(result, Err(OrderError::InvalidAmount { .. })));
    }
}

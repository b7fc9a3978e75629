//! Synchronous order orchestrator.

use chrono::Utc;
use common::AggregateId;
use domain::{CreateOrder, Order, OrderStatus, Role, UserId};
use order_store::OrderStore;

use crate::error::{Result, SagaError};
use crate::services::{FundsService, IdentityService, InventoryService};
use crate::steps;

/// Runs each order transition as one call against the collaborators.
///
/// Every step reads fresh state. Steps run strictly in order and nothing is
/// rolled back automatically when a later step fails; `cancel` is the only
/// compensation and must be requested explicitly.
pub struct OrderCoordinator<O, I, F, U>
where
    O: OrderStore,
    I: InventoryService,
    F: FundsService,
    U: IdentityService,
{
    orders: O,
    inventory: I,
    funds: F,
    identity: U,
}

impl<O, I, F, U> OrderCoordinator<O, I, F, U>
where
    O: OrderStore,
    I: InventoryService,
    F: FundsService,
    U: IdentityService,
{
    pub fn new(orders: O, inventory: I, funds: F, identity: U) -> Self {
        Self {
            orders,
            inventory,
            funds,
            identity,
        }
    }

    /// Places an order, takes the stock and charges the customer.
    ///
    /// If the stock update or the debit fails, earlier effects are left in
    /// place and the error is returned.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id))]
    pub async fn create(&self, cmd: CreateOrder) -> Result<Order> {
        let product = self.inventory.get_product(cmd.product_id).await?;
        let order = steps::price(&cmd, &product, Utc::now())?;

        let wallet = self.funds.get_wallet_by_user(cmd.customer_id).await?;
        steps::ensure_funds(&wallet, order.amount())?;

        self.orders.create(&order).await?;

        let remaining = product.quantity - order.quantity();
        self.inventory
            .update_product(product.id, product.with_quantity(remaining))
            .await?;
        self.funds.debit(wallet.id, order.amount()).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(amount = %order.amount(), "order placed");
        Ok(order)
    }

    /// Seller accepts a placed order.
    #[tracing::instrument(skip(self))]
    pub async fn approve(&self, order_id: AggregateId, seller_id: UserId) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        steps::require_status(&order, OrderStatus::Placed, "accept")?;
        self.require_role(seller_id, Role::Seller).await?;

        order.accept(Utc::now())?;
        self.orders.update(&order).await?;

        record_transition(steps::STEP_ACCEPT_ORDER);
        Ok(order)
    }

    /// Deliverer picks up an accepted order.
    #[tracing::instrument(skip(self))]
    pub async fn dispatch(&self, order_id: AggregateId, deliverer_id: UserId) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        steps::require_status(&order, OrderStatus::Accepted, "start delivery")?;
        self.require_role(deliverer_id, Role::Deliverer).await?;

        order.start_delivery(deliverer_id, Utc::now())?;
        self.orders.update(&order).await?;

        record_transition(steps::STEP_START_DELIVERY);
        Ok(order)
    }

    /// Customer confirms delivery; seller and deliverer are paid.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_delivered(
        &self,
        order_id: AggregateId,
        customer_id: UserId,
    ) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        steps::require_status(&order, OrderStatus::Delivering, "confirm delivery")?;
        self.require_role(customer_id, Role::Customer).await?;

        let deliverer_id = order
            .deliverer_id()
            .ok_or_else(|| SagaError::not_found("deliverer", order_id))?;
        let payout = order.payout()?;

        let seller_wallet = self.funds.get_wallet_by_user(order.seller_id()).await?;
        self.funds.credit(seller_wallet.id, payout.seller).await?;
        let deliverer_wallet = self.funds.get_wallet_by_user(deliverer_id).await?;
        self.funds
            .credit(deliverer_wallet.id, payout.deliverer)
            .await?;

        order.mark_delivered(Utc::now())?;
        self.orders.update(&order).await?;

        record_transition(steps::STEP_CONFIRM_DELIVERY);
        tracing::info!(seller = %payout.seller, deliverer = %payout.deliverer, "order delivered");
        Ok(order)
    }

    /// Refunds the customer and restocks the product.
    ///
    /// The order status is left as it is, so an order can be cancelled more
    /// than once and each call refunds again.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: AggregateId) -> Result<Order> {
        let order = self.load(order_id).await?;
        steps::require_cancelable(&order)?;

        let wallet = self.funds.get_wallet_by_user(order.customer_id()).await?;
        self.funds.credit(wallet.id, order.amount()).await?;

        let product = self.inventory.get_product(order.product_id()).await?;
        let restocked = product.quantity.saturating_add(order.quantity());
        self.inventory
            .update_product(product.id, product.with_quantity(restocked))
            .await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(status = %order.status(), "order cancelled");
        Ok(order)
    }

    /// Cancels the order if it still can be, then removes it.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, order_id: AggregateId) -> Result<()> {
        let order = self.load(order_id).await?;
        if order.can_cancel() {
            self.cancel(order_id).await?;
        }
        self.orders.delete(order_id).await?;
        tracing::info!("order deleted");
        Ok(())
    }

    pub async fn get(&self, order_id: AggregateId) -> Result<Order> {
        self.load(order_id).await
    }

    pub async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.orders.list().await?)
    }

    pub async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Order>> {
        Ok(self.orders.list_by_seller(seller_id).await?)
    }

    pub async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        Ok(self.orders.list_by_status(status).await?)
    }

    async fn load(&self, order_id: AggregateId) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| SagaError::not_found("order", order_id))
    }

    async fn require_role(&self, user_id: UserId, role: Role) -> Result<()> {
        let user = self.identity.get_user(user_id).await?;
        steps::require_role(&user, role)
    }
}

fn record_transition(transition: &'static str) {
    metrics::counter!("order_transitions_total", "transition" => transition).increment(1);
    tracing::info!(transition, "order transition completed");
}

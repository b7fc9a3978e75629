//! API-facing entry points for durable orders.

use common::AggregateId;
use domain::{ProductId, Role, UserId};

use crate::error::Result;
use crate::services::{FundsService, IdentityService, InventoryService};
use crate::steps;
use crate::workflow::engine::{ExecutionHandle, WorkflowEngine};
use crate::workflow::signals::{OrderSignal, QUERY_ORDER_BY_ID, StartOrder};
use crate::workflow::state::OrderWorkflowState;

/// Starts, signals and queries order executions.
///
/// Snapshots are taken here, before the engine is involved. Every signal is
/// checked against the acting user's role, the same way the synchronous
/// orchestrator checks its transitions.
pub struct OrderWorkflowService<W, I, F, U>
where
    W: WorkflowEngine,
    I: InventoryService,
    F: FundsService,
    U: IdentityService,
{
    engine: W,
    inventory: I,
    funds: F,
    identity: U,
    task_queue: String,
}

impl<W, I, F, U> OrderWorkflowService<W, I, F, U>
where
    W: WorkflowEngine,
    I: InventoryService,
    F: FundsService,
    U: IdentityService,
{
    pub fn new(
        engine: W,
        inventory: I,
        funds: F,
        identity: U,
        task_queue: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            inventory,
            funds,
            identity,
            task_queue: task_queue.into(),
        }
    }

    /// Snapshots the product and the customer and seller wallets, then
    /// starts an execution whose id is the new order id.
    #[tracing::instrument(skip(self))]
    pub async fn start_order(
        &self,
        customer_id: UserId,
        seller_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<ExecutionHandle> {
        let product = self.inventory.get_product(product_id).await?;
        let customer_wallet = self.funds.get_wallet_by_user(customer_id).await?;
        let seller_wallet = self.funds.get_wallet_by_user(seller_id).await?;

        let input = StartOrder {
            customer_id,
            seller_id,
            product_id,
            quantity,
            product,
            customer_wallet,
            seller_wallet,
        };
        self.engine
            .start_execution(AggregateId::new(), &self.task_queue, input)
            .await
    }

    pub async fn query_order(&self, order_id: AggregateId) -> Result<OrderWorkflowState> {
        let payload = self
            .engine
            .query_execution(order_id, QUERY_ORDER_BY_ID)
            .await?;
        Ok(serde_json::from_value(payload)?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn accept_order(&self, order_id: AggregateId, seller_id: UserId) -> Result<()> {
        self.require_role(seller_id, Role::Seller).await?;
        self.engine
            .signal_execution(order_id, OrderSignal::accept())
            .await
    }

    /// Resolves the deliverer's wallet and hands it to the execution.
    #[tracing::instrument(skip(self))]
    pub async fn start_delivery(&self, order_id: AggregateId, deliverer_id: UserId) -> Result<()> {
        self.require_role(deliverer_id, Role::Deliverer).await?;
        let wallet = self.funds.get_wallet_by_user(deliverer_id).await?;
        self.engine
            .signal_execution(order_id, OrderSignal::start_delivery(wallet))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm_delivered(
        &self,
        order_id: AggregateId,
        customer_id: UserId,
    ) -> Result<()> {
        self.require_role(customer_id, Role::Customer).await?;
        self.engine
            .signal_execution(order_id, OrderSignal::delivered())
            .await
    }

    async fn require_role(&self, user_id: UserId, role: Role) -> Result<()> {
        let user = self.identity.get_user(user_id).await?;
        steps::require_role(&user, role)
    }
}

//! Side effects a durable execution performs through collaborators.

use async_trait::async_trait;
use domain::Payout;

use crate::error::{Result, SagaError};
use crate::services::{FundsService, InventoryService, Wallet};
use crate::steps;
use crate::workflow::state::OrderWorkflowState;

/// External calls made by an execution.
///
/// The execution journals an activity's result, so an activity runs again
/// only if the process stops before its result is recorded.
#[async_trait]
pub trait WorkflowActivities: Send + Sync + 'static {
    /// Commits a delivered order's effects: takes the stock, charges the
    /// customer and pays the seller and the deliverer.
    ///
    /// Stock and the customer's balance are read again before anything is
    /// written.
    async fn settle(&self, state: &OrderWorkflowState) -> Result<Payout>;

    /// Whether `settle` can reach real collaborators. Executions waiting for
    /// settlement are not resumed by activities that cannot.
    fn can_settle(&self) -> bool {
        true
    }
}

/// Activities backed by the inventory and funds collaborators.
#[derive(Debug, Clone)]
pub struct OrderActivities<I, F> {
    inventory: I,
    funds: F,
}

impl<I, F> OrderActivities<I, F>
where
    I: InventoryService,
    F: FundsService,
{
    pub fn new(inventory: I, funds: F) -> Self {
        Self { inventory, funds }
    }
}

#[async_trait]
impl<I, F> WorkflowActivities for OrderActivities<I, F>
where
    I: InventoryService + 'static,
    F: FundsService + 'static,
{
    #[tracing::instrument(skip(self, state), fields(order_id = ?state.order().map(|o| o.id())))]
    async fn settle(&self, state: &OrderWorkflowState) -> Result<Payout> {
        let order = state
            .order()
            .ok_or_else(|| SagaError::Upstream("settlement before placement".to_string()))?;
        let snapshot = |wallet: Option<&Wallet>, who: &'static str| {
            wallet
                .cloned()
                .ok_or_else(|| SagaError::not_found("wallet", who))
        };
        let customer_wallet = snapshot(state.customer_wallet(), "customer")?;
        let seller_wallet = snapshot(state.seller_wallet(), "seller")?;
        let deliverer_wallet = snapshot(state.deliverer_wallet(), "deliverer")?;
        let payout = order.payout()?;

        // The snapshot balance may be stale by now.
        let customer_wallet = self
            .funds
            .get_wallet_by_user(customer_wallet.user_id)
            .await?;
        steps::ensure_funds(&customer_wallet, order.amount())?;

        let product = self.inventory.get_product(order.product_id()).await?;
        let remaining = product.quantity.checked_sub(order.quantity()).ok_or(
            SagaError::InsufficientInventory {
                product_id: product.id,
                requested: order.quantity(),
                available: product.quantity,
            },
        )?;
        self.inventory
            .update_product(product.id, product.with_quantity(remaining))
            .await?;

        self.funds.debit(customer_wallet.id, order.amount()).await?;
        self.funds.credit(seller_wallet.id, payout.seller).await?;
        self.funds
            .credit(deliverer_wallet.id, payout.deliverer)
            .await?;

        tracing::info!(seller = %payout.seller, deliverer = %payout.deliverer, "order settled");
        Ok(payout)
    }
}

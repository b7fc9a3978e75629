use async_trait::async_trait;
use common::AggregateId;
use domain::{Order, OrderStatus, UserId};

use crate::Result;

/// Storage for orders.
///
/// Implementations must be thread-safe. There is no optimistic concurrency
/// on order records: the last `update` wins.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order. Fails with `AlreadyExists` on a duplicate id.
    async fn create(&self, order: &Order) -> Result<()>;

    /// Writes the mutable fields (status, deliverer, updated-at) of an
    /// existing order. Fails with `NotFound` if it does not exist.
    async fn update(&self, order: &Order) -> Result<()>;

    async fn get(&self, id: AggregateId) -> Result<Option<Order>>;

    /// All orders, oldest first.
    async fn list(&self) -> Result<Vec<Order>>;

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Order>>;

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;

    /// Removes an order. Fails with `NotFound` if it does not exist.
    async fn delete(&self, id: AggregateId) -> Result<()>;
}

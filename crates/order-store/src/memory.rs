use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{Order, OrderRecord, OrderStatus, UserId};
use tokio::sync::RwLock;

use crate::store::OrderStore;
use crate::{OrderStoreError, Result};

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<AggregateId, OrderRecord>,
    /// Insertion order, for stable listings.
    order: Vec<AggregateId>,
}

/// In-memory order store.
///
/// Orders are kept in their persisted record form so that reads go through
/// the same conversion as the PostgreSQL store. Clones share storage.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn collect(&self, filter: impl Fn(&OrderRecord) -> bool) -> Result<Vec<Order>> {
        let records = self.records.read().await;
        records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id))
            .filter(|record| filter(record))
            .map(|record| Order::try_from(record.clone()).map_err(OrderStoreError::from))
            .collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        let mut records = self.records.write().await;
        if records.by_id.contains_key(&order.id()) {
            return Err(OrderStoreError::AlreadyExists(order.id()));
        }
        records.by_id.insert(order.id(), OrderRecord::from(order));
        records.order.push(order.id());
        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .by_id
            .get_mut(&order.id())
            .ok_or(OrderStoreError::NotFound(order.id()))?;

        let updated = OrderRecord::from(order);
        record.status = updated.status;
        record.deliverer_id = updated.deliverer_id;
        record.updated_at = updated.updated_at;
        Ok(())
    }

    async fn get(&self, id: AggregateId) -> Result<Option<Order>> {
        let records = self.records.read().await;
        records
            .by_id
            .get(&id)
            .cloned()
            .map(Order::try_from)
            .transpose()
            .map_err(Into::into)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        self.collect(|_| true).await
    }

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Order>> {
        let seller = seller_id.as_uuid();
        self.collect(|record| record.seller_id == seller).await
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let code = status.code();
        self.collect(|record| record.status == code).await
    }

    async fn delete(&self, id: AggregateId) -> Result<()> {
        let mut records = self.records.write().await;
        if records.by_id.remove(&id).is_none() {
            return Err(OrderStoreError::NotFound(id));
        }
        records.order.retain(|existing| *existing != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use domain::{CreateOrder, Money, ProductId};

    use super::*;

    fn order_for(seller_id: UserId) -> Order {
        let cmd = CreateOrder::new(UserId::new(), seller_id, ProductId::new(), 2);
        Order::place(
            &cmd,
            Money::from_dollars(5),
            Money::from_dollars(1),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryOrderStore::new();
        let order = order_for(UserId::new());

        store.create(&order).await.unwrap();

        let loaded = store.get(order.id()).await.unwrap().unwrap();
        assert_eq!(loaded, order);
        assert!(store.get(AggregateId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let store = InMemoryOrderStore::new();
        let order = order_for(UserId::new());
        store.create(&order).await.unwrap();

        let result = store.create(&order).await;
        assert!(matches!(result, Err(OrderStoreError::AlreadyExists(id)) if id == order.id()));
    }

    #[tokio::test]
    async fn test_update_writes_status_and_deliverer() {
        let store = InMemoryOrderStore::new();
        let mut order = order_for(UserId::new());
        store.create(&order).await.unwrap();

        let deliverer = UserId::new();
        order.accept(Utc::now()).unwrap();
        order.start_delivery(deliverer, Utc::now()).unwrap();
        store.update(&order).await.unwrap();

        let loaded = store.get(order.id()).await.unwrap().unwrap();
        assert_eq!(loaded.status(), OrderStatus::Delivering);
        assert_eq!(loaded.deliverer_id(), Some(deliverer));
        assert_eq!(loaded.amount(), order.amount());
    }

    #[tokio::test]
    async fn test_update_missing_order_fails() {
        let store = InMemoryOrderStore::new();
        let order = order_for(UserId::new());
        assert!(matches!(
            store.update(&order).await,
            Err(OrderStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_filters() {
        let store = InMemoryOrderStore::new();
        let seller = UserId::new();
        let first = order_for(seller);
        let mut second = order_for(seller);
        let other = order_for(UserId::new());

        for order in [&first, &second, &other] {
            store.create(order).await.unwrap();
        }
        second.accept(Utc::now()).unwrap();
        store.update(&second).await.unwrap();

        let all: Vec<_> = store.list().await.unwrap().iter().map(Order::id).collect();
        assert_eq!(all, vec![first.id(), second.id(), other.id()]);

        let by_seller = store.list_by_seller(seller).await.unwrap();
        assert_eq!(by_seller.len(), 2);

        let placed = store.list_by_status(OrderStatus::Placed).await.unwrap();
        assert_eq!(placed.len(), 2);
        let accepted = store.list_by_status(OrderStatus::Accepted).await.unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id(), second.id());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryOrderStore::new();
        let order = order_for(UserId::new());
        store.create(&order).await.unwrap();

        store.delete(order.id()).await.unwrap();

        assert!(store.is_empty().await);
        assert!(matches!(
            store.delete(order.id()).await,
            Err(OrderStoreError::NotFound(_))
        ));
    }
}

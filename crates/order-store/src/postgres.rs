use async_trait::async_trait;
use common::AggregateId;
use domain::{Order, OrderRecord, OrderStatus, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::store::OrderStore;
use crate::{OrderStoreError, Result};

const SELECT_ORDERS: &str = r#"
    SELECT id, customer_id, seller_id, product_id, deliverer_id, status, quantity,
           unit_price, delivery_cost, amount, created_at, updated_at
    FROM orders
"#;

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the workspace migrations against the pool.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let record = OrderRecord {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            seller_id: row.try_get("seller_id")?,
            product_id: row.try_get("product_id")?,
            deliverer_id: row.try_get("deliverer_id")?,
            status: row.try_get("status")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            delivery_cost: row.try_get("delivery_cost")?,
            amount: row.try_get("amount")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        };
        Ok(Order::try_from(record)?)
    }

    fn rows_to_orders(rows: Vec<PgRow>) -> Result<Vec<Order>> {
        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn create(&self, order: &Order) -> Result<()> {
        let record = OrderRecord::from(order);
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, seller_id, product_id, deliverer_id, status,
                                quantity, unit_price, delivery_cost, amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(record.customer_id)
        .bind(record.seller_id)
        .bind(record.product_id)
        .bind(record.deliverer_id)
        .bind(record.status)
        .bind(record.quantity)
        .bind(record.unit_price)
        .bind(record.delivery_cost)
        .bind(record.amount)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return OrderStoreError::AlreadyExists(order.id());
            }
            OrderStoreError::Database(e)
        })?;
        Ok(())
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn update(&self, order: &Order) -> Result<()> {
        let record = OrderRecord::from(order);
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, deliverer_id = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(record.status)
        .bind(record.deliverer_id)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::NotFound(order.id()));
        }
        Ok(())
    }

    async fn get(&self, id: AggregateId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDERS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!("{SELECT_ORDERS} ORDER BY created_at ASC"))
            .fetch_all(&self.pool)
            .await?;
        Self::rows_to_orders(rows)
    }

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDERS} WHERE seller_id = $1 ORDER BY created_at ASC"
        ))
        .bind(seller_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Self::rows_to_orders(rows)
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDERS} WHERE status = $1 ORDER BY created_at ASC"
        ))
        .bind(status.code())
        .fetch_all(&self.pool)
        .await?;
        Self::rows_to_orders(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: AggregateId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::NotFound(id));
        }
        Ok(())
    }
}

//! Worker hosting durable order executions.
//!
//! On startup the worker picks a journal (PostgreSQL when `DATABASE_URL` is
//! set, memory otherwise), rebuilds every journaled execution and resumes
//! the ones still running, then waits for a shutdown signal.
//!
//! Collaborators are injected by the caller through the activities passed to
//! [`run`]. Executions are started and signalled in-process through
//! `saga::OrderWorkflowService` over the same journal.

pub mod config;
pub mod telemetry;

use std::future::Future;

use async_trait::async_trait;
use domain::Payout;
use event_store::{EventStore, EventStoreError, InMemoryEventStore, PostgresEventStore};
use saga::{EngineConfig, LocalEngine, OrderWorkflowState, SagaError, WorkflowActivities};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use config::{Config, ConfigError, LogFormat};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics exporter error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    #[error("Signal handler error: {0}")]
    Signal(#[from] std::io::Error),
}

/// Activities for a worker without collaborator adapters.
///
/// Running executions are resumed and keep their timeout, but delivered
/// executions waiting for settlement are held for a worker that can settle.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedActivities;

#[async_trait]
impl WorkflowActivities for DetachedActivities {
    async fn settle(&self, _state: &OrderWorkflowState) -> saga::Result<Payout> {
        Err(SagaError::Upstream(
            "no inventory or funds collaborators configured".to_string(),
        ))
    }

    fn can_settle(&self) -> bool {
        false
    }
}

/// Runs the worker until `shutdown` resolves.
pub async fn run<A>(
    config: Config,
    activities: A,
    shutdown: impl Future<Output = std::io::Result<()>>,
) -> Result<(), WorkerError>
where
    A: WorkflowActivities,
{
    telemetry::init_metrics(config.metrics_addr)?;

    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresEventStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL journal");
            serve(store, activities, config.engine_config(), shutdown).await?;
        }
        None => {
            tracing::info!("using in-memory journal");
            serve(
                InMemoryEventStore::new(),
                activities,
                config.engine_config(),
                shutdown,
            )
            .await?;
        }
    }
    Ok(())
}

/// Recovers journaled executions and keeps them running until `shutdown`
/// resolves. Returns how many executions were resumed.
pub async fn serve<E, A>(
    store: E,
    activities: A,
    engine_config: EngineConfig,
    shutdown: impl Future<Output = std::io::Result<()>>,
) -> Result<usize, WorkerError>
where
    E: EventStore + Clone + 'static,
    A: WorkflowActivities,
{
    let task_queue = engine_config.task_queue.clone();
    let can_settle = activities.can_settle();
    let engine = LocalEngine::new(store, activities, engine_config);
    let resumed = engine.recover().await?;
    tracing::info!(%task_queue, resumed, can_settle, "worker started");

    let result = shutdown.await;
    tracing::info!("shutting down");
    engine.shutdown().await;
    result?;
    Ok(resumed)
}

#[cfg(test)]
mod tests {
    use domain::{Money, Role};
    use saga::workflow::DEFAULT_TASK_QUEUE;
    use saga::{
        InMemoryFundsService, InMemoryIdentityService, InMemoryInventoryService, OrderActivities,
        OrderWorkflowService,
    };

    use super::*;

    #[tokio::test]
    async fn test_serve_resumes_running_executions() {
        let store = InMemoryEventStore::new();
        let inventory = InMemoryInventoryService::new();
        let funds = InMemoryFundsService::new();
        let identity = InMemoryIdentityService::new();

        let customer = identity.register(Role::Customer).await;
        let seller = identity.register(Role::Seller).await;
        funds.open_wallet(customer.id, Money::from_dollars(50)).await;
        funds.open_wallet(seller.id, Money::zero()).await;
        let product = inventory
            .add_product(seller.id, "Lamp", Money::from_dollars(10), Money::zero(), 5)
            .await
            .unwrap();

        let engine = LocalEngine::new(
            store.clone(),
            OrderActivities::new(inventory.clone(), funds.clone()),
            EngineConfig::default(),
        );
        let service = OrderWorkflowService::new(
            engine.clone(),
            inventory.clone(),
            funds.clone(),
            identity,
            DEFAULT_TASK_QUEUE,
        );
        service
            .start_order(customer.id, seller.id, product.id, 1)
            .await
            .unwrap();
        engine.shutdown().await;

        let resumed = serve(
            store.clone(),
            OrderActivities::new(inventory, funds),
            EngineConfig::default(),
            async { Ok(()) },
        )
        .await
        .unwrap();
        assert_eq!(resumed, 1);

        let detached = serve(store, DetachedActivities, EngineConfig::default(), async {
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(detached, 1);
    }

    #[tokio::test]
    async fn test_detached_activities_refuse_to_settle() {
        assert!(!DetachedActivities.can_settle());

        let err = DetachedActivities
            .settle(&OrderWorkflowState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SagaError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_serve_reports_signal_handler_errors() {
        let result = serve(
            InMemoryEventStore::new(),
            DetachedActivities,
            EngineConfig::default(),
            async { Err(std::io::Error::other("no signal handler")) },
        )
        .await;
        assert!(matches!(result, Err(WorkerError::Signal(_))));
    }
}

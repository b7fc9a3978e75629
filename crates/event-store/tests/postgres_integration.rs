//! PostgreSQL journal integration tests.
//!
//! These tests share one PostgreSQL container. Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration
//! ```

use std::sync::Arc;

use event_store::{
    AggregateId, AppendOptions, EventEnvelope, EventStore, EventStoreError, PostgresEventStore,
    Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresEventStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn test_store() -> PostgresEventStore {
    let info = container_info().await;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn event(aggregate_id: AggregateId, aggregate_type: &str, version: i64) -> EventEnvelope {
    EventEnvelope::new(
        aggregate_id,
        aggregate_type,
        "TestEvent",
        Version::new(version),
        &serde_json::json!({ "version": version }),
    )
    .unwrap()
}

#[tokio::test]
#[serial]
async fn append_and_read_stream() {
    let store = test_store().await;
    let id = AggregateId::new();

    let version = store
        .append(
            vec![event(id, "OrderWorkflow", 1), event(id, "OrderWorkflow", 2)],
            AppendOptions::expect_new(),
        )
        .await
        .unwrap();
    assert_eq!(version, Version::new(2));

    let events = store.get_events_for_aggregate(id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].payload, serde_json::json!({ "version": 2 }));
    assert_eq!(
        store.get_aggregate_version(id).await.unwrap(),
        Some(Version::new(2))
    );
}

#[tokio::test]
#[serial]
async fn stale_writer_gets_conflict() {
    let store = test_store().await;
    let id = AggregateId::new();

    store
        .append(vec![event(id, "OrderWorkflow", 1)], AppendOptions::expect_new())
        .await
        .unwrap();

    let result = store
        .append(vec![event(id, "OrderWorkflow", 1)], AppendOptions::new())
        .await;
    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));

    let result = store
        .append(vec![event(id, "OrderWorkflow", 2)], AppendOptions::expect_new())
        .await;
    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
#[serial]
async fn lists_stream_ids_by_type() {
    let store = test_store().await;
    let a = AggregateId::new();
    let b = AggregateId::new();
    let other = AggregateId::new();

    store
        .append(vec![event(a, "OrderWorkflow", 1)], AppendOptions::new())
        .await
        .unwrap();
    store
        .append(vec![event(other, "Other", 1)], AppendOptions::new())
        .await
        .unwrap();
    store
        .append(
            vec![event(b, "OrderWorkflow", 1), event(b, "OrderWorkflow", 2)],
            AppendOptions::new(),
        )
        .await
        .unwrap();

    let ids = store.list_aggregate_ids("OrderWorkflow").await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a) && ids.contains(&b));
}

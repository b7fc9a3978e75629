use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{AppendOptions, EventStore, validate_batch};
use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

#[derive(Debug, Default)]
struct Streams {
    by_id: HashMap<AggregateId, Vec<EventEnvelope>>,
    /// Stream ids in creation order.
    order: Vec<AggregateId>,
}

/// In-memory journal.
///
/// Clones share the same storage, so a clone handed to a "restarted" engine
/// sees everything the previous one wrote.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<Streams>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.by_id.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_batch(&events)?;
        let aggregate_id = events[0].aggregate_id;
        let first_version = events[0].version;

        let mut streams = self.streams.write().await;
        let current = streams
            .by_id
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version)
            .unwrap_or_default();

        if let Some(expected) = options.expected_version
            && expected != current
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current,
            });
        }
        if first_version != current.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: first_version,
                actual: current,
            });
        }

        let last = events.last().map(|e| e.version).unwrap_or(current);
        if !streams.by_id.contains_key(&aggregate_id) {
            streams.order.push(aggregate_id);
        }
        streams.by_id.entry(aggregate_id).or_default().extend(events);

        Ok(last)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        Ok(streams.by_id.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let streams = self.streams.read().await;
        Ok(streams
            .by_id
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version))
    }

    async fn list_aggregate_ids(&self, aggregate_type: &str) -> Result<Vec<AggregateId>> {
        let streams = self.streams.read().await;
        Ok(streams
            .order
            .iter()
            .filter(|id| {
                streams
                    .by_id
                    .get(*id)
                    .and_then(|stream| stream.first())
                    .is_some_and(|e| e.aggregate_type == aggregate_type)
            })
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(aggregate_id: AggregateId, version: i64, event_type: &str) -> EventEnvelope {
        EventEnvelope::new(
            aggregate_id,
            "TestStream",
            event_type,
            Version::new(version),
            &serde_json::json!({ "test": true }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn append_and_read_back_in_order() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let version = store
            .append(
                vec![event(id, 1, "A"), event(id, 2, "B")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();
        assert_eq!(version, Version::new(2));

        let events = store.get_events_for_aggregate(id).await.unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, ["A", "B"]);
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn stale_expected_version_is_a_conflict() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, 1, "A")], AppendOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .append(vec![event(id, 2, "B")], AppendOptions::expect_new())
            .await;
        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn gap_in_versions_is_a_conflict_even_without_expectation() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let result = store.append(vec![event(id, 3, "A")], AppendOptions::new()).await;
        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn empty_or_mixed_batches_are_rejected() {
        let store = InMemoryEventStore::new();
        assert!(matches!(
            store.append(vec![], AppendOptions::new()).await,
            Err(EventStoreError::InvalidAppend(_))
        ));

        let mixed = vec![event(AggregateId::new(), 1, "A"), event(AggregateId::new(), 2, "B")];
        assert!(matches!(
            store.append(mixed, AppendOptions::new()).await,
            Err(EventStoreError::InvalidAppend(_))
        ));
    }

    #[tokio::test]
    async fn aggregate_version_tracks_last_event() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        assert_eq!(store.get_aggregate_version(id).await.unwrap(), None);

        store
            .append(vec![event(id, 1, "A")], AppendOptions::expect_new())
            .await
            .unwrap();
        store
            .append(
                vec![event(id, 2, "B")],
                AppendOptions::expect_version(Version::first()),
            )
            .await
            .unwrap();

        assert_eq!(
            store.get_aggregate_version(id).await.unwrap(),
            Some(Version::new(2))
        );
    }

    #[tokio::test]
    async fn list_ids_filters_by_type_and_keeps_creation_order() {
        let store = InMemoryEventStore::new();
        let first = AggregateId::new();
        let second = AggregateId::new();
        let other = AggregateId::new();

        store
            .append(vec![event(first, 1, "A")], AppendOptions::new())
            .await
            .unwrap();
        let mut foreign = event(other, 1, "A");
        foreign.aggregate_type = "Other".to_string();
        store.append(vec![foreign], AppendOptions::new()).await.unwrap();
        store
            .append(vec![event(second, 1, "A")], AppendOptions::new())
            .await
            .unwrap();

        let ids = store.list_aggregate_ids("TestStream").await.unwrap();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let store = InMemoryEventStore::new();
        let clone = store.clone();
        let id = AggregateId::new();

        store
            .append(vec![event(id, 1, "A")], AppendOptions::new())
            .await
            .unwrap();

        assert_eq!(clone.get_events_for_aggregate(id).await.unwrap().len(), 1);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

#[derive(Default)]
struct Log {
    /// Every event in commit order.
    events: Vec<EventEnvelope>,
    /// Head version per stream.
    heads: HashMap<AggregateId, Version>,
}

/// Event store kept entirely in process memory.
///
/// Used by tests and when the server runs without `DATABASE_URL`. Cloning
/// shares the same log.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<Log>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events across all streams.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.events.len()
    }

    /// Event type names of one stream, oldest first. Handy in assertions.
    pub async fn event_types(&self, aggregate_id: AggregateId) -> Vec<String> {
        self.log
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let first_version = events[0].version;

        let mut log = self.log.write().await;
        let head = log
            .heads
            .get(&aggregate_id)
            .copied()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && head != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: head,
            });
        }

        // Mirrors the unique (aggregate_id, version) constraint of the
        // PostgreSQL backend for unchecked appends.
        if first_version != head.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(head),
                actual: head,
            });
        }

        let new_head = events.last().map(|e| e.version).unwrap_or(head);
        log.events.extend(events);
        log.heads.insert(aggregate_id, new_head);

        Ok(new_head)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        self.get_events_for_aggregate_from_version(aggregate_id, Version::first())
            .await
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        Ok(log
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version >= from_version)
            .cloned()
            .collect())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.log.read().await.events.clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.log.read().await.heads.get(&aggregate_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStoreExt;
    use futures_util::StreamExt;

    fn event(aggregate_id: AggregateId, version: i64, event_type: &str) -> EventEnvelope {
        EventEnvelope::new(
            aggregate_id,
            "Cart",
            Version::new(version),
            event_type,
            serde_json::json!({"test": true}),
        )
    }

    #[tokio::test]
    async fn append_to_new_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let version = store
            .append(vec![event(id, 1, "CartLineAdded")], AppendOptions::expect_new())
            .await
            .unwrap();

        assert_eq!(version, Version::first());
        assert_eq!(store.get_aggregate_version(id).await.unwrap(), Some(version));
        assert!(store.aggregate_exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn stale_writer_gets_conflict() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(vec![event(id, 1, "CartLineAdded")], AppendOptions::expect_new())
            .await
            .unwrap();

        // Second writer loaded the stream before the first append.
        let err = store
            .append(vec![event(id, 1, "CartLineAdded")], AppendOptions::expect_new())
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn unchecked_append_still_rejects_duplicate_versions() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(vec![event(id, 1, "A")], AppendOptions::new())
            .await
            .unwrap();
        let result = store
            .append(vec![event(id, 1, "B")], AppendOptions::new())
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reads_are_scoped_to_stream_and_version() {
        let store = InMemoryEventStore::new();
        let cart = AggregateId::new();
        let other = AggregateId::new();

        store
            .append(
                vec![event(cart, 1, "A"), event(cart, 2, "B"), event(cart, 3, "C")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();
        store
            .append(vec![event(other, 1, "X")], AppendOptions::expect_new())
            .await
            .unwrap();

        let all = store.get_events_for_aggregate(cart).await.unwrap();
        assert_eq!(all.len(), 3);

        let tail = store
            .get_events_for_aggregate_from_version(cart, Version::new(2))
            .await
            .unwrap();
        let types: Vec<_> = tail.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, ["B", "C"]);

        assert_eq!(store.event_types(other).await, vec!["X".to_string()]);
    }

    #[tokio::test]
    async fn stream_all_preserves_commit_order() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        for (id, version, name) in [(a, 1, "a1"), (b, 1, "b1"), (a, 2, "a2")] {
            store
                .append(vec![event(id, version, name)], AppendOptions::new())
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .stream_all_events()
            .await
            .unwrap()
            .map(|e| e.unwrap().event_type)
            .collect()
            .await;

        assert_eq!(names, ["a1", "b1", "a2"]);
    }
}

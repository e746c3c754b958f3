//! Projection processor for feeding events to projections.

use event_store::{EventEnvelope, EventStore};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Feeds events from the store to registered projections.
///
/// Catch-up is pull based: queries call [`run_catch_up`](Self::run_catch_up)
/// before reading, so views are current as of the request. Passes are
/// serialized so two concurrent requests never deliver the same event twice.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    catch_up_lock: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up_lock: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Streams the whole log and hands each projection the events past its
    /// position.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let _guard = self.catch_up_lock.lock().await;

        let mut stream = self.store.stream_all_events().await?;
        let mut event_index: u64 = 0;
        let mut delivered: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            event_index += 1;

            for projection in &self.projections {
                if projection.position().await.events_processed < event_index {
                    projection.handle(&event).await?;
                    delivered += 1;
                    metrics::counter!("projections_events_processed").increment(1);
                }
            }
        }

        if delivered > 0 {
            tracing::debug!(log_length = event_index, delivered, "catch-up complete");
        }
        Ok(())
    }

    /// Delivers one event to every projection, outside of catch-up.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &EventEnvelope) -> Result<()> {
        for projection in &self.projections {
            projection.handle(event).await?;
        }
        Ok(())
    }

    /// Resets every projection and replays the log from the start.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        for projection in &self.projections {
            tracing::info!(projection = projection.name(), "resetting projection");
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{AppendOptions, InMemoryEventStore, Version};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    struct CountingProjection {
        count: Arc<RwLock<u64>>,
        position: Arc<RwLock<ProjectionPosition>>,
    }

    impl CountingProjection {
        fn new() -> Self {
            Self {
                count: Arc::new(RwLock::new(0)),
                position: Arc::new(RwLock::new(ProjectionPosition::zero())),
            }
        }
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
            *self.count.write().await += 1;
            let mut pos = self.position.write().await;
            *pos = pos.advance();
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn cart_event(aggregate_id: AggregateId, version: i64) -> EventEnvelope {
        EventEnvelope::new(
            aggregate_id,
            "Cart",
            Version::new(version),
            "CartLineAdded",
            serde_json::json!({"product": "p1"}),
        )
    }

    async fn store_with_events(n: i64) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        if n > 0 {
            let events = (1..=n).map(|v| cart_event(id, v)).collect();
            store.append(events, AppendOptions::expect_new()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn catch_up_processes_all_events() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store_with_events(3).await);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count.read().await, 3);
    }

    #[tokio::test]
    async fn catch_up_skips_already_processed() {
        let store = store_with_events(3).await;
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count.read().await, 3);

        store
            .append(vec![cart_event(AggregateId::new(), 1)], AppendOptions::expect_new())
            .await
            .unwrap();
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count.read().await, 4);
    }

    #[tokio::test]
    async fn concurrent_catch_ups_deliver_once() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store_with_events(20).await);
        processor.register(Box::new(projection));
        let processor = Arc::new(processor);

        let a = tokio::spawn({
            let p = Arc::clone(&processor);
            async move { p.run_catch_up().await }
        });
        let b = tokio::spawn({
            let p = Arc::clone(&processor);
            async move { p.run_catch_up().await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(*count.read().await, 20);
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let pos = Arc::clone(&projection.position);
        let mut processor = ProjectionProcessor::new(store_with_events(2).await);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        processor.rebuild_all().await.unwrap();

        assert_eq!(*count.read().await, 2);
        assert_eq!(pos.read().await.events_processed, 2);
    }

    #[tokio::test]
    async fn process_single_event() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(InMemoryEventStore::new());
        processor.register(Box::new(projection));

        processor
            .process_event(&cart_event(AggregateId::new(), 1))
            .await
            .unwrap();

        assert_eq!(*count.read().await, 1);
        assert_eq!(processor.projection_count(), 1);
    }

    #[tokio::test]
    async fn empty_store_catch_up() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(InMemoryEventStore::new());
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count.read().await, 0);
    }
}

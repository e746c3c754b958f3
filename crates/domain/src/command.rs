//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Outcome of a successfully executed command.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// State after the new events were applied.
    pub aggregate: A,

    /// Events that were appended. Empty when the command was a no-op.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// A request to change one aggregate.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    fn aggregate_id(&self) -> AggregateId;
}

/// Loads an aggregate, runs a command function against it and appends the
/// resulting events with an optimistic-concurrency check.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replays a stream. Returns the default state if the stream is empty.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let mut aggregate = A::default();

        for envelope in self.store.get_events_for_aggregate(aggregate_id).await? {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Replays a stream, returning `None` if it was never created.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Runs `command_fn` against the current state and persists its events.
    ///
    /// The append expects the stream to still be at the loaded version, so a
    /// concurrent writer makes this fail with a concurrency conflict instead
    /// of overwriting.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let loaded_version = aggregate.version();

        let events = command_fn(&aggregate)?;
        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: loaded_version,
            });
        }

        let envelopes = self.build_envelopes(aggregate_id, loaded_version, &events)?;
        let new_version = self
            .store
            .append(envelopes, AppendOptions::after(loaded_version))
            .await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Like [`execute`](Self::execute), but reloads and re-runs the command
    /// when another writer got there first, up to `attempts` times in total.
    ///
    /// Only safe for commands whose decision depends solely on the state
    /// they are handed.
    pub async fn execute_retrying<F>(
        &self,
        aggregate_id: AggregateId,
        attempts: usize,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 1;
        loop {
            match self.execute(aggregate_id, &command_fn).await {
                Err(DomainError::EventStore(e)) if e.is_conflict() && attempt < attempts => {
                    metrics::counter!(
                        "command_concurrency_retries_total",
                        "aggregate" => A::aggregate_type()
                    )
                    .increment(1);
                    tracing::debug!(%aggregate_id, attempt, "retrying after concurrent write");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn build_envelopes(
        &self,
        aggregate_id: AggregateId,
        loaded_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut version = loaded_version;
        events
            .iter()
            .map(|event| {
                version = version.next();
                EventEnvelope::from_event(
                    aggregate_id,
                    A::aggregate_type(),
                    version,
                    event.event_type(),
                    event,
                )
                .map_err(DomainError::from)
            })
            .collect()
    }
}

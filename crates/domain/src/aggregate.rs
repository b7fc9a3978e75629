//! Reducer traits for event-sourced state.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// An immutable fact recorded in a journal.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// State rebuilt by folding its events.
///
/// `apply` must be pure and deterministic: the same state and event always
/// yield the same next state, without side effects and without failing.
/// Decisions that can fail are made before an event is produced.
pub trait Aggregate: Send + Sync + Sized {
    type Event: DomainEvent;

    /// Stream type used in the journal.
    fn aggregate_type() -> &'static str;

    fn id(&self) -> Option<AggregateId>;

    /// Number of events applied so far.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

//! Stub aggregate root and event.

use aggsource_core::aggregate::AggregateRoot;
use aggsource_core::event::DomainEvent;
use serde::{Deserialize, Serialize};

/// A numbered event carrying no other data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubEvent(pub i32);

impl DomainEvent for StubEvent {
    fn event_type(&self) -> &'static str {
        "stub.event"
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::json!(self.0)
    }
}

/// A root that remembers every event applied to it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StubRoot {
    recorded_events: Vec<StubEvent>,
    uncommitted_events: Vec<StubEvent>,
}

impl StubRoot {
    /// Creates an event-less root; usable as a `RootFactory`.
    #[must_use]
    pub fn factory() -> Self {
        Self::default()
    }

    /// Every event applied so far, historical or new.
    #[must_use]
    pub fn recorded_events(&self) -> &[StubEvent] {
        &self.recorded_events
    }

    /// Raises a new event as command handling would.
    pub fn raise(&mut self, event: StubEvent) {
        self.apply(&event);
    }
}

impl AggregateRoot for StubRoot {
    type Event = StubEvent;

    fn apply(&mut self, event: &Self::Event) {
        self.recorded_events.push(*event);
        self.uncommitted_events.push(*event);
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

//! Aggregate root abstraction and the unit-of-work tracking record.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use crate::event::DomainEvent;

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Send + Sync + 'static {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);

    /// Returns `true` when there are events pending persistence.
    fn has_changes(&self) -> bool {
        !self.uncommitted_events().is_empty()
    }

    /// Applies historical events in order. Anything `apply` records as
    /// uncommitted along the way is discarded.
    fn replay<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        for event in events {
            self.apply(event);
        }
        self.clear_uncommitted_events();
    }
}

/// Produces fresh, event-less roots.
pub trait RootFactory<R>: Send + Sync {
    /// Creates a new root.
    fn create(&self) -> R;
}

impl<R, F> RootFactory<R> for F
where
    F: Fn() -> R + Send + Sync,
{
    fn create(&self) -> R {
        self()
    }
}

/// Root handle shared between the unit of work and its callers.
pub type SharedRoot<R> = Arc<Mutex<R>>;

/// Type-erased view of a tracked root.
pub trait TrackedRoot: Send + Sync {
    /// Returns `true` when the root has uncommitted events.
    fn has_changes(&self) -> bool;

    /// Upcasts for downcasting back to a concrete `SharedRoot`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: AggregateRoot> TrackedRoot for Mutex<R> {
    fn has_changes(&self) -> bool {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .has_changes()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Tracking record of one root within a unit of work.
#[derive(Clone)]
pub struct Aggregate {
    identifier: String,
    expected_version: i64,
    root: Arc<dyn TrackedRoot>,
}

impl Aggregate {
    /// Creates a tracking record. `expected_version` is the stream version
    /// observed at load time, `0` for a root that has never been stored.
    #[must_use]
    pub fn new<R: AggregateRoot>(
        identifier: impl Into<String>,
        expected_version: i64,
        root: SharedRoot<R>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            expected_version,
            root,
        }
    }

    /// Returns the aggregate identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the originating stream version.
    #[must_use]
    pub fn expected_version(&self) -> i64 {
        self.expected_version
    }

    /// Returns the root if it is an `R`.
    #[must_use]
    pub fn root<R: AggregateRoot>(&self) -> Option<SharedRoot<R>> {
        Arc::clone(&self.root).into_any().downcast::<Mutex<R>>().ok()
    }

    /// Returns `true` when the root has uncommitted events.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.root.has_changes()
    }
}

impl std::fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregate")
            .field("identifier", &self.identifier)
            .field("expected_version", &self.expected_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Opened;

    impl DomainEvent for Opened {
        fn event_type(&self) -> &'static str {
            "account.opened"
        }

        fn to_payload(&self) -> serde_json::Value {
            serde_json::Value::Null
        }
    }

    #[derive(Debug, Default)]
    struct Account {
        applied: usize,
        uncommitted: Vec<Opened>,
    }

    impl AggregateRoot for Account {
        type Event = Opened;

        fn apply(&mut self, _event: &Self::Event) {
            self.applied += 1;
            self.uncommitted.push(Opened);
        }

        fn uncommitted_events(&self) -> &[Self::Event] {
            &self.uncommitted
        }

        fn clear_uncommitted_events(&mut self) {
            self.uncommitted.clear();
        }
    }

    #[derive(Debug, Default)]
    struct Other {
        uncommitted: Vec<Opened>,
    }

    impl AggregateRoot for Other {
        type Event = Opened;

        fn apply(&mut self, _event: &Self::Event) {}

        fn uncommitted_events(&self) -> &[Self::Event] {
            &self.uncommitted
        }

        fn clear_uncommitted_events(&mut self) {
            self.uncommitted.clear();
        }
    }

    #[test]
    fn test_replay_applies_in_order_and_discards_recorded_events() {
        let mut account = Account::default();

        account.replay(&[Opened, Opened]);

        assert_eq!(account.applied, 2);
        assert!(!account.has_changes());
    }

    #[test]
    fn test_root_downcasts_to_the_same_instance() {
        let root: SharedRoot<Account> = Arc::new(Mutex::new(Account::default()));
        let aggregate = Aggregate::new("a-1", 4, Arc::clone(&root));

        let tracked = aggregate.root::<Account>().unwrap();

        assert!(Arc::ptr_eq(&tracked, &root));
        assert_eq!(aggregate.identifier(), "a-1");
        assert_eq!(aggregate.expected_version(), 4);
    }

    #[test]
    fn test_root_of_another_type_is_none() {
        let aggregate = Aggregate::new("a-1", 0, Arc::new(Mutex::new(Account::default())));

        assert!(aggregate.root::<Other>().is_none());
    }

    #[test]
    fn test_has_changes_reflects_uncommitted_events() {
        let root = Arc::new(Mutex::new(Account::default()));
        let aggregate = Aggregate::new("a-1", 0, Arc::clone(&root));
        assert!(!aggregate.has_changes());

        root.lock().unwrap().apply(&Opened);

        assert!(aggregate.has_changes());
    }
}

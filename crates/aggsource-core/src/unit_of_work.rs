//! Per-operation tracking of loaded and added aggregates.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::aggregate::Aggregate;
use crate::error::DomainError;

/// Tracks at most one [`Aggregate`] per identifier for the duration of one
/// business operation. Dropping it discards every tracked record.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    aggregates: Mutex<HashMap<String, Arc<Aggregate>>>,
}

impl UnitOfWork {
    /// Creates an empty unit of work.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `aggregate`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateAggregate` if an aggregate with the same
    /// identifier is already tracked. The tracked record is left untouched.
    pub fn attach(&self, aggregate: Aggregate) -> Result<(), DomainError> {
        match self.lock().entry(aggregate.identifier().to_owned()) {
            Entry::Occupied(entry) => {
                tracing::warn!(identifier = %entry.key(), "aggregate already attached");
                Err(DomainError::DuplicateAggregate(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                tracing::debug!(
                    identifier = %entry.key(),
                    expected_version = aggregate.expected_version(),
                    "aggregate attached"
                );
                entry.insert(Arc::new(aggregate));
                Ok(())
            }
        }
    }

    /// Returns the tracked aggregate for `identifier`, if any.
    #[must_use]
    pub fn try_get(&self, identifier: &str) -> Option<Arc<Aggregate>> {
        self.lock().get(identifier).cloned()
    }

    /// Attaches `aggregate` unless its identifier is already tracked, and
    /// returns whichever record ends up tracked.
    pub(crate) fn get_or_attach(&self, aggregate: Aggregate) -> Arc<Aggregate> {
        let mut aggregates = self.lock();
        if let Some(existing) = aggregates.get(aggregate.identifier()) {
            tracing::debug!(
                identifier = aggregate.identifier(),
                "aggregate attached concurrently; keeping first record"
            );
            return Arc::clone(existing);
        }
        let tracked = Arc::new(aggregate);
        aggregates.insert(tracked.identifier().to_owned(), Arc::clone(&tracked));
        tracked
    }

    /// Returns `true` when any tracked root has uncommitted events.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.snapshot()
            .iter()
            .any(|aggregate| aggregate.has_changes())
    }

    /// Returns the tracked aggregates whose roots have uncommitted events.
    #[must_use]
    pub fn changes(&self) -> Vec<Arc<Aggregate>> {
        self.snapshot()
            .into_iter()
            .filter(|aggregate| aggregate.has_changes())
            .collect()
    }

    /// Returns the number of tracked aggregates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Roots are locked only after the map lock is released.
    fn snapshot(&self) -> Vec<Arc<Aggregate>> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Aggregate>>> {
        self.aggregates.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

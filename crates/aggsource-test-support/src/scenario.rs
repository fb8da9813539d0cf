//! Builds repositories over a seeded store and unit of work.

use std::collections::HashMap;
use std::sync::Arc;

use aggsource_core::aggregate::Aggregate;
use aggsource_core::config::{PassThroughStreamNameResolver, ReaderConfiguration};
use aggsource_core::error::DomainError;
use aggsource_core::event::{EventCodec, JsonEventCodec};
use aggsource_core::repository::Repository;
use aggsource_core::store::EventStoreConnection;
use aggsource_core::unit_of_work::UnitOfWork;
use aggsource_event_store::memory::InMemoryEventStore;

use crate::root::{StubEvent, StubRoot};

/// Reader configuration for `StubEvent` streams named after their
/// identifiers.
///
/// # Errors
///
/// Returns `DomainError::InvalidConfiguration` if `page_size` is zero.
pub fn stub_configuration(
    page_size: usize,
) -> Result<Arc<ReaderConfiguration<StubEvent>>, DomainError> {
    ReaderConfiguration::new(
        page_size,
        Arc::new(JsonEventCodec::<StubEvent>::new()),
        Arc::new(PassThroughStreamNameResolver),
    )
    .map(Arc::new)
}

#[derive(Debug)]
enum Step {
    Append(String, Vec<StubEvent>),
    Delete(String),
}

/// Seeds an in-memory store and a unit of work, in scheduling order, before
/// building a `Repository<StubRoot>` over them.
#[derive(Debug)]
pub struct RepositoryScenarioBuilder {
    store: InMemoryEventStore,
    page_size: usize,
    steps: Vec<Step>,
    attached: Vec<Aggregate>,
}

impl Default for RepositoryScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryScenarioBuilder {
    /// Starts a scenario with an empty store and unit of work.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: InMemoryEventStore::new(),
            page_size: 2,
            steps: Vec::new(),
            attached: Vec::new(),
        }
    }

    /// Overrides the reader page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Schedules `events` to be appended to the stream of `identifier`.
    #[must_use]
    pub fn schedule_append_to_stream(
        mut self,
        identifier: &str,
        events: impl IntoIterator<Item = StubEvent>,
    ) -> Self {
        self.steps
            .push(Step::Append(identifier.to_owned(), events.into_iter().collect()));
        self
    }

    /// Schedules the stream of `identifier` to be deleted.
    #[must_use]
    pub fn schedule_delete_stream(mut self, identifier: &str) -> Self {
        self.steps.push(Step::Delete(identifier.to_owned()));
        self
    }

    /// Schedules `aggregate` to be attached to the unit of work.
    #[must_use]
    pub fn schedule_attach_to_unit_of_work(mut self, aggregate: Aggregate) -> Self {
        self.attached.push(aggregate);
        self
    }

    /// The store the scenario seeds; clones share its streams.
    #[must_use]
    pub fn store(&self) -> InMemoryEventStore {
        self.store.clone()
    }

    /// Runs the scheduled steps and builds the repository.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while seeding the store or the unit of
    /// work.
    pub async fn build_for_repository(self) -> Result<Repository<StubRoot>, DomainError> {
        let codec = JsonEventCodec::<StubEvent>::new();
        let mut versions: HashMap<String, i64> = HashMap::new();
        for step in self.steps {
            match step {
                Step::Append(stream, events) => {
                    let data = events
                        .iter()
                        .map(|event| codec.encode(event))
                        .collect::<Result<Vec<_>, _>>()?;
                    let expected = versions.get(&stream).copied().unwrap_or(0);
                    let version = self.store.append_to_stream(&stream, expected, &data).await?;
                    versions.insert(stream, version);
                }
                Step::Delete(stream) => {
                    self.store.delete_stream(&stream).await?;
                    versions.remove(&stream);
                }
            }
        }

        let unit_of_work = Arc::new(UnitOfWork::new());
        for aggregate in self.attached {
            unit_of_work.attach(aggregate)?;
        }

        Ok(Repository::new(
            Arc::new(StubRoot::factory),
            unit_of_work,
            Arc::new(self.store),
            stub_configuration(self.page_size)?,
        ))
    }
}

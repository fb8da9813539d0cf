//! Repository that rebuilds aggregate roots from their event streams.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::aggregate::{Aggregate, AggregateRoot, RootFactory, SharedRoot};
use crate::config::ReaderConfiguration;
use crate::error::{AggregateNotFoundError, DomainError};
use crate::optional::Optional;
use crate::reader::{PagedEventReader, StreamReadOutcome};
use crate::store::EventStoreConnection;
use crate::unit_of_work::UnitOfWork;

/// Loads roots of type `R` through a [`UnitOfWork`], replaying their
/// streams on first access.
///
/// Per identifier and unit of work, a root moves from untracked to attached
/// exactly once, either by replay (`get`, `get_optional`) or directly (`add`).
pub struct Repository<R: AggregateRoot> {
    root_factory: Arc<dyn RootFactory<R>>,
    unit_of_work: Arc<UnitOfWork>,
    connection: Arc<dyn EventStoreConnection>,
    configuration: Arc<ReaderConfiguration<R::Event>>,
}

impl<R: AggregateRoot> Repository<R> {
    /// Creates a repository bound to one unit of work and one connection.
    #[must_use]
    pub fn new(
        root_factory: Arc<dyn RootFactory<R>>,
        unit_of_work: Arc<UnitOfWork>,
        connection: Arc<dyn EventStoreConnection>,
        configuration: Arc<ReaderConfiguration<R::Event>>,
    ) -> Self {
        Self {
            root_factory,
            unit_of_work,
            connection,
            configuration,
        }
    }

    /// Starts a builder whose `build` reports missing collaborators.
    #[must_use]
    pub fn builder() -> RepositoryBuilder<R> {
        RepositoryBuilder::default()
    }

    /// The factory producing fresh roots.
    #[must_use]
    pub fn root_factory(&self) -> &Arc<dyn RootFactory<R>> {
        &self.root_factory
    }

    /// The unit of work roots are attached to.
    #[must_use]
    pub fn unit_of_work(&self) -> &Arc<UnitOfWork> {
        &self.unit_of_work
    }

    /// The connection streams are read from.
    #[must_use]
    pub fn connection(&self) -> &Arc<dyn EventStoreConnection> {
        &self.connection
    }

    /// The reader configuration.
    #[must_use]
    pub fn configuration(&self) -> &Arc<ReaderConfiguration<R::Event>> {
        &self.configuration
    }

    /// Returns the root for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the stream is missing,
    /// deleted, or empty, plus any error `get_optional` returns.
    pub async fn get(&self, identifier: &str) -> Result<SharedRoot<R>, DomainError> {
        self.get_optional(identifier)
            .await?
            .into_option()
            .ok_or_else(|| AggregateNotFoundError::of::<R>(identifier).into())
    }

    /// Returns the root for `identifier`, or empty if it has no history.
    ///
    /// # Errors
    ///
    /// Propagates connection and decoding errors, and returns
    /// `DomainError::RootTypeMismatch` if the identifier is tracked with a
    /// root of another type.
    #[tracing::instrument(skip(self), fields(root = std::any::type_name::<R>()))]
    pub async fn get_optional(
        &self,
        identifier: &str,
    ) -> Result<Optional<SharedRoot<R>>, DomainError> {
        if let Some(aggregate) = self.unit_of_work.try_get(identifier) {
            tracing::trace!("served from unit of work");
            return Self::root_of(&aggregate).map(Optional::of);
        }

        let reader = PagedEventReader::new(self.connection.as_ref(), self.configuration.as_ref());
        let (events, version) = match reader.read(identifier).await? {
            StreamReadOutcome::NotFound | StreamReadOutcome::StreamDeleted => {
                return Ok(Optional::empty());
            }
            StreamReadOutcome::Events { events, version } => (events, version),
        };
        if events.is_empty() {
            return Ok(Optional::empty());
        }

        let mut root = self.root_factory.create();
        root.replay(&events);
        tracing::debug!(version, events = events.len(), "aggregate replayed");

        let tracked = self
            .unit_of_work
            .get_or_attach(Aggregate::new(identifier, version, Arc::new(Mutex::new(root))));
        Self::root_of(&tracked).map(Optional::of)
    }

    /// Tracks a root that has never been stored.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateAggregate` if `identifier` is already
    /// tracked.
    pub fn add(&self, identifier: &str, root: SharedRoot<R>) -> Result<(), DomainError> {
        self.unit_of_work.attach(Aggregate::new(identifier, 0, root))
    }

    fn root_of(aggregate: &Aggregate) -> Result<SharedRoot<R>, DomainError> {
        aggregate
            .root::<R>()
            .ok_or_else(|| DomainError::RootTypeMismatch {
                identifier: aggregate.identifier().to_owned(),
                expected: std::any::type_name::<R>(),
            })
    }
}

impl<R: AggregateRoot> fmt::Debug for Repository<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &std::any::type_name::<R>())
            .field("unit_of_work", &self.unit_of_work)
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

/// Collects a repository's collaborators, any of which may be missing.
pub struct RepositoryBuilder<R: AggregateRoot> {
    root_factory: Option<Arc<dyn RootFactory<R>>>,
    unit_of_work: Option<Arc<UnitOfWork>>,
    connection: Option<Arc<dyn EventStoreConnection>>,
    configuration: Option<Arc<ReaderConfiguration<R::Event>>>,
}

impl<R: AggregateRoot> Default for RepositoryBuilder<R> {
    fn default() -> Self {
        Self {
            root_factory: None,
            unit_of_work: None,
            connection: None,
            configuration: None,
        }
    }
}

impl<R: AggregateRoot> RepositoryBuilder<R> {
    /// Sets the root factory.
    #[must_use]
    pub fn root_factory(mut self, root_factory: Arc<dyn RootFactory<R>>) -> Self {
        self.root_factory = Some(root_factory);
        self
    }

    /// Sets the unit of work.
    #[must_use]
    pub fn unit_of_work(mut self, unit_of_work: Arc<UnitOfWork>) -> Self {
        self.unit_of_work = Some(unit_of_work);
        self
    }

    /// Sets the store connection.
    #[must_use]
    pub fn connection(mut self, connection: Arc<dyn EventStoreConnection>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Sets the reader configuration.
    #[must_use]
    pub fn configuration(mut self, configuration: Arc<ReaderConfiguration<R::Event>>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Builds the repository.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingArgument` naming the first collaborator
    /// that was not supplied.
    pub fn build(self) -> Result<Repository<R>, DomainError> {
        Ok(Repository::new(
            self.root_factory
                .ok_or(DomainError::MissingArgument("root_factory"))?,
            self.unit_of_work
                .ok_or(DomainError::MissingArgument("unit_of_work"))?,
            self.connection
                .ok_or(DomainError::MissingArgument("connection"))?,
            self.configuration
                .ok_or(DomainError::MissingArgument("configuration"))?,
        ))
    }
}

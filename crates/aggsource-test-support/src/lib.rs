//! Shared test doubles and scenario builders for aggsource.

mod root;
mod scenario;
mod store;

pub use root::{StubEvent, StubRoot};
pub use scenario::{RepositoryScenarioBuilder, stub_configuration};
pub use store::{FailingEventStore, YieldingEventStore};

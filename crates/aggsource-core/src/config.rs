//! Reader configuration.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::DomainError;
use crate::event::EventCodec;

/// Environment variable that overrides the page size.
pub const PAGE_SIZE_ENV: &str = "AGGSOURCE_PAGE_SIZE";

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Maps an aggregate identifier to the name of its stream.
pub trait StreamNameResolver: Send + Sync {
    /// Returns the stream name for `identifier`.
    fn resolve(&self, identifier: &str) -> String;
}

impl<F> StreamNameResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve(&self, identifier: &str) -> String {
        self(identifier)
    }
}

/// Uses the identifier itself as the stream name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughStreamNameResolver;

impl StreamNameResolver for PassThroughStreamNameResolver {
    fn resolve(&self, identifier: &str) -> String {
        identifier.to_owned()
    }
}

/// Prefixes the identifier, e.g. `order-42` for prefix `order`.
#[derive(Debug, Clone)]
pub struct PrefixedStreamNameResolver {
    prefix: String,
}

impl PrefixedStreamNameResolver {
    /// Creates a resolver producing `"{prefix}-{identifier}"`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl StreamNameResolver for PrefixedStreamNameResolver {
    fn resolve(&self, identifier: &str) -> String {
        format!("{}-{identifier}", self.prefix)
    }
}

/// Plain reader settings, loadable from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReaderSettings {
    /// Maximum number of events requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ReaderSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidConfiguration` if `AGGSOURCE_PAGE_SIZE`
    /// is set but not a positive integer.
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let Some(raw) = lookup(PAGE_SIZE_ENV) else {
            return Ok(Self::default());
        };
        let page_size: usize = raw.trim().parse().map_err(|e| {
            DomainError::InvalidConfiguration(format!("{PAGE_SIZE_ENV} must be a valid usize: {e}"))
        })?;
        validate_page_size(page_size)?;
        Ok(Self { page_size })
    }
}

fn validate_page_size(page_size: usize) -> Result<(), DomainError> {
    if page_size == 0 {
        return Err(DomainError::InvalidConfiguration(
            "page size must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Everything the paged reader needs besides a connection.
pub struct ReaderConfiguration<E> {
    page_size: usize,
    codec: Arc<dyn EventCodec<E>>,
    stream_name_resolver: Arc<dyn StreamNameResolver>,
}

impl<E> ReaderConfiguration<E> {
    /// Creates a configuration.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidConfiguration` if `page_size` is zero.
    pub fn new(
        page_size: usize,
        codec: Arc<dyn EventCodec<E>>,
        stream_name_resolver: Arc<dyn StreamNameResolver>,
    ) -> Result<Self, DomainError> {
        validate_page_size(page_size)?;
        Ok(Self {
            page_size,
            codec,
            stream_name_resolver,
        })
    }

    /// Creates a configuration from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidConfiguration` if the page size is zero.
    pub fn from_settings(
        settings: ReaderSettings,
        codec: Arc<dyn EventCodec<E>>,
        stream_name_resolver: Arc<dyn StreamNameResolver>,
    ) -> Result<Self, DomainError> {
        Self::new(settings.page_size, codec, stream_name_resolver)
    }

    /// Maximum number of events requested per page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The codec used to decode stored records.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn EventCodec<E>> {
        &self.codec
    }

    /// Maps `identifier` to its stream name.
    #[must_use]
    pub fn stream_name(&self, identifier: &str) -> String {
        self.stream_name_resolver.resolve(identifier)
    }
}

impl<E> fmt::Debug for ReaderConfiguration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfiguration")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

//! Value-or-absence container returned by non-failing lookups.

use crate::error::DomainError;

/// A value that may be absent.
///
/// Equality is structural: two empty values are equal, and two present
/// values are equal when their contents are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Optional<T>(Option<T>);

impl<T> Optional<T> {
    /// The absent value.
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    /// Wraps a present value.
    #[must_use]
    pub const fn of(value: T) -> Self {
        Self(Some(value))
    }

    /// Returns `true` when a value is present.
    #[must_use]
    pub const fn has_value(&self) -> bool {
        self.0.is_some()
    }

    /// Borrows the contained value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` when empty.
    pub fn value(&self) -> Result<&T, DomainError> {
        self.0
            .as_ref()
            .ok_or_else(|| DomainError::InvalidOperation("optional has no value".into()))
    }

    /// Converts into the standard library option.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        self.0
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

impl<T> From<Optional<T>> for Option<T> {
    fn from(value: Optional<T>) -> Self {
        value.0
    }
}

impl<T> IntoIterator for Optional<T> {
    type Item = T;
    type IntoIter = std::option::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

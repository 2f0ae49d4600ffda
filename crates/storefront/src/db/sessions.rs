//! Persisted session record.

use super::{KeyValueStore, RepositoryError, SESSION_KEY, read_optional, write_document};
use crate::models::Session;

/// Repository for the single current-session record.
pub struct SessionRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> SessionRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// The stored session, `None` if absent or unreadable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub fn load(&self) -> Result<Option<Session>, RepositoryError> {
        read_optional(self.store, SESSION_KEY)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub fn save(&self, session: &Session) -> Result<(), RepositoryError> {
        write_document(self.store, SESSION_KEY, session)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub fn clear(&self) -> Result<(), RepositoryError> {
        self.store.remove(SESSION_KEY)
    }
}

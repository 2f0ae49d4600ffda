//! User repository.
//!
//! Users are kept as a single JSON array under [`USERS_KEY`]. Emails are
//! stored normalized, so lookups compare [`Email`] values directly.

use bookstore_core::{Email, UserId};

use super::{KeyValueStore, RepositoryError, USERS_KEY, read_document, write_document};
use crate::models::StoredUser;

/// Repository for user records.
pub struct UserRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// All users, in signup order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub fn list(&self) -> Result<Vec<StoredUser>, RepositoryError> {
        read_document(self.store, USERS_KEY)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub fn get_by_email(&self, email: &Email) -> Result<Option<StoredUser>, RepositoryError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|stored| stored.user.email == *email))
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub fn get_by_id(&self, id: UserId) -> Result<Option<StoredUser>, RepositoryError> {
        Ok(self.list()?.into_iter().find(|stored| stored.user.id == id))
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError` for storage failures.
    pub fn create(&self, user: StoredUser) -> Result<StoredUser, RepositoryError> {
        let mut users = self.list()?;
        if users.iter().any(|u| u.user.email == user.user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        users.push(user.clone());
        write_document(self.store, USERS_KEY, &users)?;
        Ok(user)
    }

    /// Replace an existing user record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this ID.
    /// Returns `RepositoryError::Conflict` if the new email belongs to someone else.
    pub fn update(&self, user: StoredUser) -> Result<StoredUser, RepositoryError> {
        let mut users = self.list()?;

        if users
            .iter()
            .any(|u| u.user.id != user.user.id && u.user.email == user.user.email)
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let slot = users
            .iter_mut()
            .find(|u| u.user.id == user.user.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = user.clone();

        write_document(self.store, USERS_KEY, &users)?;
        Ok(user)
    }
}

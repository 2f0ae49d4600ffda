//! Persistence for storefront state.
//!
//! # Storage model
//!
//! Everything lives in a flat key-value store of JSON documents:
//!
//! - `users` - every registered user with its password hash
//! - `session` - the current sign-in, if any
//! - `cart:<owner>` - cart lines for a user id or `guest`
//! - `wishlist:<owner>` - wishlisted books for a user id or `guest`
//! - `orders:<owner>` - order history, newest first
//!
//! Two backends implement [`KeyValueStore`]: [`MemoryStore`] (the default)
//! and [`FileStore`], which keeps one JSON file per key in a data directory.
//!
//! Repositories sit on top and speak in domain types. A document that no
//! longer parses is logged and treated as absent; only I/O failures reach
//! the caller.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::config::StorageConfig;

pub mod buckets;
pub mod file;
pub mod memory;
pub mod sessions;
pub mod users;

pub use buckets::{Bucket, BucketRepository};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use sessions::SessionRepository;
pub use users::UserRepository;

/// Key of the users collection.
pub const USERS_KEY: &str = "users";

/// Key of the current session record.
pub const SESSION_KEY: &str = "session";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Reading or writing the backing storage failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Raw string storage keyed by name.
///
/// Implementations must be safe to share across threads; the session
/// expiry task writes through the same store as the foreground.
pub trait KeyValueStore: Send + Sync {
    /// Read the document under `key`. `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, RepositoryError>;

    /// Replace the document under `key`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError>;

    /// Delete the document under `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), RepositoryError>;
}

/// Open the backend selected by configuration.
///
/// # Errors
///
/// Returns `RepositoryError::Io` if the data directory cannot be created.
pub fn open(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, RepositoryError> {
    match &config.data_dir {
        Some(dir) => Ok(Arc::new(FileStore::open(dir)?)),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Load and decode the document under `key`.
///
/// Missing documents and documents that fail to parse both yield `T::default()`.
pub(crate) fn read_document<T>(store: &dyn KeyValueStore, key: &str) -> Result<T, RepositoryError>
where
    T: DeserializeOwned + Default,
{
    Ok(read_optional(store, key)?.unwrap_or_default())
}

/// Load and decode the document under `key`, `None` if missing or unreadable.
pub(crate) fn read_optional<T>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, RepositoryError>
where
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable stored document");
            Ok(None)
        }
    }
}

/// Encode `value` and store it under `key`.
pub(crate) fn write_document<T>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), RepositoryError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

//! Per-owner collections: carts, wishlists and order histories.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{KeyValueStore, RepositoryError, read_document, write_document};
use crate::models::{Cart, OrderHistory, Owner, Wishlist};

/// A collection stored once per [`Owner`] under `<KIND>:<owner>`.
pub trait Bucket: Serialize + DeserializeOwned + Default {
    /// Key prefix.
    const KIND: &'static str;

    /// Storage key for `owner`'s copy of this collection.
    fn key(owner: Owner) -> String {
        format!("{}:{owner}", Self::KIND)
    }
}

impl Bucket for Cart {
    const KIND: &'static str = "cart";
}

impl Bucket for Wishlist {
    const KIND: &'static str = "wishlist";
}

impl Bucket for OrderHistory {
    const KIND: &'static str = "orders";
}

/// Repository for per-owner buckets.
pub struct BucketRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> BucketRepository<'a> {
    /// Create a new bucket repository.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Load `owner`'s bucket, empty if absent or unreadable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub fn load<B: Bucket>(&self, owner: Owner) -> Result<B, RepositoryError> {
        read_document(self.store, &B::key(owner))
    }

    /// Replace `owner`'s bucket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub fn save<B: Bucket>(&self, owner: Owner, bucket: &B) -> Result<(), RepositoryError> {
        write_document(self.store, &B::key(owner), bucket)
    }

    /// Delete `owner`'s bucket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub fn clear<B: Bucket>(&self, owner: Owner) -> Result<(), RepositoryError> {
        self.store.remove(&B::key(owner))
    }

    /// Load `owner`'s bucket and delete it from storage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read or written.
    pub fn take<B: Bucket>(&self, owner: Owner) -> Result<B, RepositoryError> {
        let bucket = self.load(owner)?;
        self.clear::<B>(owner)?;
        Ok(bucket)
    }
}

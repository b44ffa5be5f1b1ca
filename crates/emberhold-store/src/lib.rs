//! Record storage for Emberhold.
//!
//! The game persists characters, items and accounts as opaque byte blobs
//! in named collections. Which engine holds them is not the game's
//! concern: it talks to a [`RecordStore`], and the server picks the
//! implementation. [`MemoryStore`] keeps everything in process memory,
//! which is what tests use. [`SledStore`] keeps it in a sled database on
//! disk, so characters and floors outlive a restart.
//!
//! Collection names used by the game:
//!
//! | collection   | key                | value               |
//! |--------------|--------------------|---------------------|
//! | `characters` | character id       | character record    |
//! | `items`      | item uuid          | item record         |
//! | `accounts`   | account name       | account record      |
//! | `rooms`      | room id            | items on the floor  |

#![allow(async_fn_in_trait)]

mod disk;
mod error;
mod memory;

pub use disk::SledStore;
pub use error::StoreError;
pub use memory::MemoryStore;

use std::future::Future;

/// A keyed blob store with per-collection index counters.
///
/// Implementations must be safe to call from many tasks at once;
/// `next_index` in particular must never hand out the same value twice
/// for one collection.
pub trait RecordStore: Send + Sync + 'static {
    /// Inserts or replaces a record.
    fn put(
        &self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetches a record. `Ok(None)` if there is no such key.
    fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Removes a record. Deleting a missing key is not an error.
    fn delete(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every record in a collection, ordered by key.
    fn scan(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<(String, Vec<u8>)>, StoreError>> + Send;

    /// Atomically allocates the next index for `collection`. The first
    /// call returns 1.
    fn next_index(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// A shared store is still a store, so a server and its tooling can hold
/// the same one.
impl<S: RecordStore> RecordStore for std::sync::Arc<S> {
    fn put(
        &self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).put(collection, key, value)
    }

    fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send {
        (**self).get(collection, key)
    }

    fn delete(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).delete(collection, key)
    }

    fn scan(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<(String, Vec<u8>)>, StoreError>> + Send {
        (**self).scan(collection)
    }

    fn next_index(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        (**self).next_index(collection)
    }
}

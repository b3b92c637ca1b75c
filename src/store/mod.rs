//! Durable resource store
//!
//! SQLite-backed key→response mapping split into named partitions (static
//! assets, API responses). The store is the only owner of cached entries;
//! strategies reach it through [`SharedStore`].

pub mod key;
pub mod populate;
pub mod storage;

use std::sync::Mutex;

use crate::error::StoreError;
use crate::http::HttpResponse;

pub use populate::ensure_populated;
pub use storage::{CachedResource, ResourceStore};

/// A [`ResourceStore`] shared between handlers.
///
/// The lock is taken per call and never held across an `.await`.
pub struct SharedStore {
    inner: Mutex<ResourceStore>,
}

impl SharedStore {
    pub fn new(store: ResourceStore) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }

    /// Run `f` with exclusive access to the store
    pub fn with<T>(
        &self,
        f: impl FnOnce(&ResourceStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        f(&guard)
    }

    pub fn get(&self, partition: &str, key: &str) -> Result<Option<CachedResource>, StoreError> {
        self.with(|store| store.get(partition, key))
    }

    pub fn put(
        &self,
        partition: &str,
        key: &str,
        url: &str,
        response: &HttpResponse,
    ) -> Result<(), StoreError> {
        self.with(|store| store.put(partition, key, url, response))
    }

    pub fn put_all(
        &self,
        partition: &str,
        entries: &[(String, HttpResponse)],
    ) -> Result<(), StoreError> {
        self.with(|store| store.put_all(partition, entries))
    }
}

//! Lock-guarded handle for sharing one cache across threads.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use dated_core::{CacheStats, Result};

use crate::cache::ExpiringResourceCache;

/// Cloneable, thread-safe handle to a single [`ExpiringResourceCache`].
///
/// Every operation holds the same lock for its whole duration, including the
/// sweep a `get` may trigger, so no thread observes an entry mid-eviction.
/// Resources never leave the lock: callers work on them through closures or
/// receive clones.
pub struct SharedCache<R> {
    inner: Arc<Mutex<ExpiringResourceCache<R>>>,
}

impl<R> Clone for SharedCache<R> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<R> SharedCache<R> {
    /// Wraps `cache` behind a lock.
    pub fn new(cache: ExpiringResourceCache<R>) -> Self {
        Self { inner: Arc::new(Mutex::new(cache)) }
    }

    /// Locks the cache for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, ExpiringResourceCache<R>> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the cache.
    pub fn with<T>(&self, f: impl FnOnce(&mut ExpiringResourceCache<R>) -> T) -> T {
        f(&mut self.inner.lock())
    }

    /// See [`ExpiringResourceCache::has`].
    pub fn has(&self, key: &str) -> bool {
        self.inner.lock().has(key)
    }

    /// Looks up `key` like [`ExpiringResourceCache::get_mut`] and runs `f` on
    /// the resource before releasing the lock.
    pub fn with_resource<T>(&self, key: &str, f: impl FnOnce(&mut R) -> T) -> Result<T> {
        let mut cache = self.inner.lock();
        let resource = cache.get_mut(key)?;
        Ok(f(resource))
    }

    /// See [`ExpiringResourceCache::insert`].
    pub fn insert(&self, key: impl Into<String>, resource: R) {
        self.inner.lock().insert(key, resource);
    }

    /// See [`ExpiringResourceCache::remove`].
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().remove(key)
    }

    /// See [`ExpiringResourceCache::clear`].
    pub fn clear(&self) -> usize {
        self.inner.lock().clear()
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }
}

impl<R: Clone> SharedCache<R> {
    /// Returns a clone of the resource cached under `key`.
    pub fn get_cloned(&self, key: &str) -> Result<R> {
        self.inner.lock().get(key).cloned()
    }
}

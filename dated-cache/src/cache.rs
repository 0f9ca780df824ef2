//! In-memory expiring cache for disposable resources.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, trace};

use dated_core::{
    validate_sweep_interval, validate_ttl, CacheConfig, CacheError, CacheStats, Clock, Disposer,
    EntryInfo, MemoryUsage, ResourceUsage, Result, Timestamp, TTL_DISABLED,
};

use crate::clock::MonotonicClock;

/// Boxed disposal callback.
type PurgeCallback<R> = Box<dyn Disposer<R> + Send>;

/// Cache entry with access bookkeeping.
struct Entry<R> {
    resource: R,
    time_inserted: Timestamp,
    time_accessed: Timestamp,
}

impl<R> Entry<R> {
    fn new(resource: R, now: Timestamp) -> Self {
        Self {
            resource,
            time_inserted: now,
            time_accessed: now,
        }
    }

    fn is_expired(&self, now: Timestamp, ttl_seconds: u64) -> bool {
        ttl_seconds != TTL_DISABLED && now.saturating_sub(self.time_accessed) > ttl_seconds
    }

    /// Access times never move backwards, even if the clock does.
    fn touch(&mut self, now: Timestamp) {
        self.time_accessed = self.time_accessed.max(now);
    }

    fn info(&self, key: &str) -> EntryInfo {
        EntryInfo {
            key: key.to_string(),
            time_inserted: self.time_inserted,
            time_accessed: self.time_accessed,
        }
    }
}

/// Cache that owns expensive resources and disposes each exactly once.
///
/// Resources are keyed by string (typically a file path). A hit through
/// [`get`](Self::get) bumps the entry's access time and may run a sweep pass
/// that evicts entries idle for longer than the TTL. Sweeps are driven by
/// access, never by a background timer, and are rate-limited by the sweep
/// interval.
///
/// # Disposal
///
/// Every resource handed to [`insert`](Self::insert) is passed to the purge
/// callback exactly once: on eviction, [`remove`](Self::remove),
/// [`clear`](Self::clear), replacement by a later insert for the same key, or
/// when the cache is dropped. Entries are always taken out of the map before
/// the callback runs. Without a callback the resource is simply dropped.
///
/// # Thread Safety
///
/// The cache has no internal locking. Share it across threads through
/// [`SharedCache`](crate::SharedCache), which serializes every operation,
/// sweeps included, behind one lock.
pub struct ExpiringResourceCache<R> {
    entries: HashMap<String, Entry<R>>,
    ttl_seconds: u64,
    sweep_interval_seconds: u64,
    last_sweep: Timestamp,
    on_dispose: Option<PurgeCallback<R>>,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl<R> ExpiringResourceCache<R> {
    /// Creates a cache with the default configuration and a monotonic clock.
    pub fn new() -> Self {
        Self::build(CacheConfig::default(), Arc::new(MonotonicClock::new()))
    }

    /// Creates a cache with custom configuration and a monotonic clock.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Creates a cache with custom configuration and clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let last_sweep = clock.now();
        Self {
            entries: HashMap::new(),
            ttl_seconds: config.ttl_seconds,
            sweep_interval_seconds: config.sweep_interval_seconds,
            last_sweep,
            on_dispose: None,
            clock,
            stats: CacheStats::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Sets the idle time before an entry expires; `0` keeps entries forever.
    ///
    /// Takes effect at the next sweep. Nothing is evicted retroactively.
    pub fn set_expiration(&mut self, ttl_seconds: u64) -> Result<()> {
        validate_ttl(ttl_seconds)?;
        self.ttl_seconds = ttl_seconds;
        Ok(())
    }

    /// Returns the current TTL in seconds.
    pub fn expiration(&self) -> u64 {
        self.ttl_seconds
    }

    /// Sets the minimum spacing between sweep passes.
    pub fn set_sweep_interval(&mut self, seconds: u64) -> Result<()> {
        validate_sweep_interval(seconds)?;
        self.sweep_interval_seconds = seconds;
        Ok(())
    }

    /// Returns the sweep interval in seconds.
    pub fn sweep_interval(&self) -> u64 {
        self.sweep_interval_seconds
    }

    /// Installs the callback invoked for every resource leaving the cache.
    ///
    /// Replacing the callback only affects later disposals. See [`Disposer`]
    /// for the no-panic contract.
    pub fn set_purge_callback<D>(&mut self, callback: D)
    where
        D: Disposer<R> + Send + 'static,
    {
        self.on_dispose = Some(Box::new(callback));
    }

    /// Returns the current configuration.
    pub fn config(&self) -> CacheConfig {
        CacheConfig {
            ttl_seconds: self.ttl_seconds,
            sweep_interval_seconds: self.sweep_interval_seconds,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP
    // ═══════════════════════════════════════════════════════════════════════════

    /// Returns true if an entry exists for `key`. Never sweeps.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the resource cached under `key`.
    ///
    /// Bumps the entry's access time and runs a sweep if the sweep interval
    /// has elapsed. The accessed entry itself survives that sweep.
    ///
    /// # Errors
    ///
    /// [`CacheError::NotFound`] if no entry exists for `key`.
    pub fn get(&mut self, key: &str) -> Result<&R> {
        self.access(key)?;
        self.entries
            .get(key)
            .map(|e| &e.resource)
            .ok_or_else(|| CacheError::not_found(key))
    }

    /// Mutable variant of [`get`](Self::get), for refreshing a resource in place.
    pub fn get_mut(&mut self, key: &str) -> Result<&mut R> {
        self.access(key)?;
        self.entries
            .get_mut(key)
            .map(|e| &mut e.resource)
            .ok_or_else(|| CacheError::not_found(key))
    }

    /// Returns the resource without touching its access time or sweeping.
    pub fn peek(&self, key: &str) -> Option<&R> {
        self.entries.get(key).map(|e| &e.resource)
    }

    fn access(&mut self, key: &str) -> Result<()> {
        let now = self.clock.now();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                trace!(key, time_accessed = entry.time_accessed, "Cache hit");
            }
            None => {
                self.stats.misses += 1;
                return Err(CacheError::not_found(key));
            }
        }
        self.stats.hits += 1;

        if now.saturating_sub(self.last_sweep) >= self.sweep_interval_seconds {
            self.sweep(now);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Takes ownership of `resource` under `key`.
    ///
    /// An existing entry for `key` is removed and disposed first.
    pub fn insert(&mut self, key: impl Into<String>, resource: R) {
        let key = key.into();
        let now = self.clock.now();

        if let Some(previous) = self.entries.remove(&key) {
            debug!(key = %key, "Replacing cached entry");
            self.stats.replacements += 1;
            self.dispose(key.clone(), previous.resource);
        }

        self.entries.insert(key, Entry::new(resource, now));
        self.stats.insertions += 1;
    }

    /// Removes and disposes the entry for `key`.
    ///
    /// Returns false, without invoking the callback, if there was none.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove_entry(key) {
            Some((key, entry)) => {
                self.stats.removals += 1;
                self.dispose(key, entry.resource);
                true
            }
            None => false,
        }
    }

    /// Disposes every entry and empties the cache. Returns the number disposed.
    pub fn clear(&mut self) -> usize {
        let count = self.dispose_all();
        self.stats.removals += count as u64;
        count
    }

    /// Runs a sweep now, regardless of the sweep interval.
    ///
    /// Returns the number of evicted entries.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        self.sweep(now)
    }

    #[instrument(level = "debug", skip(self), fields(entries = self.entries.len(), ttl = self.ttl_seconds))]
    fn sweep(&mut self, now: Timestamp) -> usize {
        let ttl = self.ttl_seconds;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now, ttl))
            .map(|(k, _)| k.clone())
            .collect();

        let evicted = expired.len();
        for key in expired {
            if let Some(entry) = self.entries.remove(&key) {
                debug!(
                    key = %key,
                    idle = now.saturating_sub(entry.time_accessed),
                    "Evicting expired entry"
                );
                self.stats.evictions += 1;
                self.dispose(key, entry.resource);
            }
        }

        self.last_sweep = now;
        self.stats.sweeps += 1;
        evicted
    }

    fn dispose(&mut self, key: String, resource: R) {
        self.stats.disposals += 1;
        match self.on_dispose.as_mut() {
            Some(callback) => callback.dispose(key, resource),
            None => drop(resource),
        }
    }

    fn dispose_all(&mut self) -> usize {
        let entries = std::mem::take(&mut self.entries);
        let count = entries.len();
        for (key, entry) in entries {
            self.dispose(key, entry.resource);
        }
        count
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSPECTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over cached keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over cached resources, in no particular order.
    ///
    /// Does not bump access times.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> + '_ {
        self.entries.iter().map(|(k, e)| (k.as_str(), &e.resource))
    }

    /// Returns the timestamps of the entry for `key`.
    pub fn entry_info(&self, key: &str) -> Option<EntryInfo> {
        self.entries.get(key).map(|e| e.info(key))
    }

    /// Returns timestamps for every entry, sorted by key.
    pub fn entries(&self) -> Vec<EntryInfo> {
        let mut infos: Vec<EntryInfo> = self.entries.iter().map(|(k, e)| e.info(k)).collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    /// Returns the time of the most recent sweep.
    pub fn last_sweep(&self) -> Timestamp {
        self.last_sweep
    }

    /// Returns the cache clock's current reading.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats.clone()
        }
    }
}

impl<R: ResourceUsage> ExpiringResourceCache<R> {
    /// Reports the footprint of every cached resource, sorted by key.
    pub fn memory_usage(&self) -> Vec<MemoryUsage> {
        let mut usage: Vec<MemoryUsage> = self
            .entries
            .iter()
            .map(|(k, e)| MemoryUsage {
                key: k.clone(),
                bytes: e.resource.memory_usage(),
            })
            .collect();
        usage.sort_by(|a, b| a.key.cmp(&b.key));
        usage
    }
}

impl<R> Default for ExpiringResourceCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for ExpiringResourceCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringResourceCache")
            .field("entries", &self.entries.len())
            .field("ttl_seconds", &self.ttl_seconds)
            .field("sweep_interval_seconds", &self.sweep_interval_seconds)
            .field("last_sweep", &self.last_sweep)
            .field("has_purge_callback", &self.on_dispose.is_some())
            .finish()
    }
}

impl<R> Drop for ExpiringResourceCache<R> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "Disposing remaining entries");
        }
        self.dispose_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_case::test_case;

    type Released = Arc<Mutex<Vec<(String, u32)>>>;

    fn make_cache(ttl: u64, interval: u64) -> (ExpiringResourceCache<u32>, ManualClock, Released) {
        let clock = ManualClock::new(0);
        let config = CacheConfig::default().with_ttl(ttl).with_sweep_interval(interval);
        let mut cache = ExpiringResourceCache::with_clock(config, Arc::new(clock.clone())).unwrap();
        let released: Released = Arc::default();
        let log = Arc::clone(&released);
        cache.set_purge_callback(move |key: String, value: u32| log.lock().push((key, value)));
        (cache, clock, released)
    }

    fn released_pairs(released: &Released) -> Vec<(String, u32)> {
        let mut pairs = released.lock().clone();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_insert_has_get() {
        let (mut cache, _clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        assert!(cache.has("a"));
        assert_eq!(*cache.get("a").unwrap(), 1);
        assert!(released.lock().is_empty());
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (mut cache, _clock, _released) = make_cache(30, 10);
        let err = cache.get("missing").unwrap_err();
        assert!(matches!(err, CacheError::NotFound(ref key) if key == "missing"));
        assert!(err.is_recoverable());
        assert!(cache.get_mut("missing").is_err());
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_idle_entry_evicted_by_later_sweep() {
        let (mut cache, clock, released) = make_cache(30, 10);
        cache.insert("a", 1);

        clock.set(5);
        assert_eq!(*cache.get("a").unwrap(), 1);
        assert!(released.lock().is_empty());

        clock.set(50);
        cache.insert("b", 2);
        assert_eq!(*cache.get("b").unwrap(), 2);

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert_eq!(released_pairs(&released), vec![("a".to_string(), 1)]);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.last_sweep(), 50);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let (mut cache, _clock, released) = make_cache(30, 10);
        assert!(!cache.remove("a"));
        assert!(released.lock().is_empty());
        assert_eq!(cache.stats().disposals, 0);
    }

    #[test]
    fn test_remove_disposes_once() {
        let (mut cache, _clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert!(!cache.has("a"));
        assert_eq!(released_pairs(&released), vec![("a".to_string(), 1)]);
    }

    #[test]
    fn test_duplicate_insert_disposes_previous() {
        let (mut cache, _clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        cache.insert("a", 2);
        assert_eq!(released_pairs(&released), vec![("a".to_string(), 1)]);
        assert_eq!(*cache.get("a").unwrap(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().replacements, 1);
    }

    #[test]
    fn test_drop_disposes_remaining() {
        let (mut cache, _clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        cache.insert("b", 2);
        drop(cache);
        assert_eq!(
            released_pairs(&released),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
    }

    #[test]
    fn test_clear_disposes_all() {
        let (mut cache, _clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(released.lock().len(), 2);

        drop(cache);
        assert_eq!(released.lock().len(), 2);
    }

    #[test]
    fn test_get_bumps_access_time() {
        let (mut cache, clock, _released) = make_cache(30, 1000);
        clock.set(2);
        cache.insert("a", 1);
        clock.set(7);
        cache.get("a").unwrap();

        let info = cache.entry_info("a").unwrap();
        assert_eq!(info.time_inserted, 2);
        assert_eq!(info.time_accessed, 7);

        // A clock stepping backwards never moves the access time back.
        clock.set(3);
        cache.get("a").unwrap();
        let info = cache.entry_info("a").unwrap();
        assert_eq!(info.time_accessed, 7);
        assert!(info.time_accessed >= info.time_inserted);
    }

    #[test]
    fn test_has_and_peek_do_not_bump_or_sweep() {
        let (mut cache, clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        clock.set(100);
        assert!(cache.has("a"));
        assert_eq!(cache.peek("a"), Some(&1));
        assert_eq!(cache.entry_info("a").unwrap().time_accessed, 0);
        assert_eq!(cache.stats().sweeps, 0);

        // Insert never sweeps either.
        cache.insert("b", 2);
        assert!(cache.has("a"));
        assert!(released.lock().is_empty());
    }

    #[test_case(30, 30, false ; "idle equal to ttl kept")]
    #[test_case(30, 31, true ; "idle past ttl evicted")]
    #[test_case(0, 10_000, false ; "ttl disabled never evicts")]
    fn test_ttl_boundary(ttl: u64, idle: u64, evicted: bool) {
        let (mut cache, clock, released) = make_cache(ttl, 1);
        cache.insert("idle", 1);
        clock.set(idle);
        cache.insert("fresh", 2);
        cache.get("fresh").unwrap();
        assert_eq!(!cache.has("idle"), evicted);
        assert_eq!(released.lock().len(), usize::from(evicted));
        assert!(cache.has("fresh"));
    }

    #[test]
    fn test_eviction_uses_access_time_not_insert_time() {
        let (mut cache, clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        cache.insert("b", 2);
        clock.set(25);
        cache.get("a").unwrap();
        clock.set(40);
        cache.get("b").unwrap();

        // "a" is 40s old but idle only 15s.
        assert!(cache.has("a"));
        assert!(released.lock().is_empty());
    }

    #[test]
    fn test_accessed_entry_survives_own_sweep() {
        let (mut cache, clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        clock.set(1000);
        assert_eq!(*cache.get("a").unwrap(), 1);
        assert!(cache.has("a"));
        assert!(released.lock().is_empty());
        assert_eq!(cache.stats().sweeps, 1);
    }

    #[test]
    fn test_sweep_rate_limited() {
        let (mut cache, clock, _released) = make_cache(30, 10);
        cache.insert("a", 1);

        clock.set(9);
        cache.get("a").unwrap();
        assert_eq!(cache.stats().sweeps, 0);

        clock.set(10);
        cache.get("a").unwrap();
        assert_eq!(cache.stats().sweeps, 1);

        clock.set(15);
        cache.get("a").unwrap();
        cache.get("a").unwrap();
        assert_eq!(cache.stats().sweeps, 1);

        clock.set(20);
        cache.get("a").unwrap();
        assert_eq!(cache.stats().sweeps, 2);
    }

    #[test]
    fn test_sweep_waits_for_interval() {
        let (mut cache, clock, released) = make_cache(30, 100);
        cache.insert("a", 1);
        cache.insert("b", 2);
        clock.set(50);
        cache.get("b").unwrap();
        assert!(cache.has("a"), "no sweep before the interval elapses");

        clock.set(100);
        cache.get("b").unwrap();
        assert!(!cache.has("a"));
        assert_eq!(released_pairs(&released), vec![("a".to_string(), 1)]);
    }

    #[test]
    fn test_set_expiration_not_retroactive() {
        let (mut cache, clock, released) = make_cache(0, 10);
        cache.insert("a", 1);
        cache.insert("b", 2);
        clock.set(100);
        cache.set_expiration(30).unwrap();
        assert_eq!(cache.expiration(), 30);
        assert!(cache.has("a"));
        assert!(released.lock().is_empty());

        cache.get("b").unwrap();
        assert!(!cache.has("a"));
    }

    #[test]
    fn test_invalid_settings_leave_state_unchanged() {
        let (mut cache, _clock, _released) = make_cache(30, 10);
        let err = cache.set_sweep_interval(0).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(cache.sweep_interval(), 10);

        assert!(cache.set_expiration(u64::MAX).is_err());
        assert_eq!(cache.expiration(), 30);

        cache.set_sweep_interval(5).unwrap();
        assert_eq!(cache.config(), CacheConfig { ttl_seconds: 30, sweep_interval_seconds: 5 });
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = CacheConfig::default().with_sweep_interval(0);
        assert!(ExpiringResourceCache::<u32>::with_config(config).is_err());
    }

    #[test]
    fn test_purge_expired_ignores_interval() {
        let (mut cache, clock, released) = make_cache(30, 1000);
        cache.insert("a", 1);
        cache.insert("b", 2);
        clock.set(20);
        cache.get("b").unwrap();
        clock.set(45);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(released_pairs(&released), vec![("a".to_string(), 1)]);
        assert_eq!(cache.last_sweep(), 45);
    }

    #[test]
    fn test_replacing_callback_affects_future_only() {
        let (mut cache, _clock, first) = make_cache(30, 10);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.remove("a");

        let second: Released = Arc::default();
        let log = Arc::clone(&second);
        cache.set_purge_callback(move |key: String, value: u32| log.lock().push((key, value)));
        cache.remove("b");

        assert_eq!(released_pairs(&first), vec![("a".to_string(), 1)]);
        assert_eq!(released_pairs(&second), vec![("b".to_string(), 2)]);
    }

    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_without_callback_resources_are_dropped() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut cache = ExpiringResourceCache::new();
        cache.insert("a", Tracked(Arc::clone(&drops)));
        cache.insert("a", Tracked(Arc::clone(&drops)));
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        cache.insert("b", Tracked(Arc::clone(&drops)));
        drop(cache);
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_get_mut_refreshes_in_place() {
        let (mut cache, _clock, released) = make_cache(30, 10);
        cache.insert("a", 1);
        *cache.get_mut("a").unwrap() += 10;
        assert_eq!(cache.peek("a"), Some(&11));
        drop(cache);
        assert_eq!(released_pairs(&released), vec![("a".to_string(), 11)]);
    }

    struct Footprint(u64);

    impl ResourceUsage for Footprint {
        fn memory_usage(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_memory_usage_sorted_by_key() {
        let mut cache = ExpiringResourceCache::new();
        cache.insert("b.cpp", Footprint(200));
        cache.insert("a.cpp", Footprint(100));
        let usage = cache.memory_usage();
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0], MemoryUsage { key: "a.cpp".into(), bytes: 100 });
        assert_eq!(usage[1], MemoryUsage { key: "b.cpp".into(), bytes: 200 });
    }

    #[test]
    fn test_inspection() {
        let (mut cache, clock, _released) = make_cache(30, 10);
        cache.insert("b", 2);
        clock.set(4);
        cache.insert("a", 1);

        let mut keys: Vec<&str> = cache.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(cache.iter().map(|(_, v)| *v).sum::<u32>(), 3);

        let entries = cache.entries();
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[0].time_inserted, 4);
        assert_eq!(entries[1].time_inserted, 0);
        assert_eq!(cache.now(), 4);
    }

    #[test]
    fn test_stats() {
        let (mut cache, _clock, _released) = make_cache(30, 10);
        cache.insert("a", 1);
        cache.insert("a", 2);
        cache.insert("b", 3);
        cache.get("a").unwrap();
        let _ = cache.get("zzz");
        cache.remove("b");

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.insertions, 3);
        assert_eq!(stats.replacements, 1);
        assert_eq!(stats.removals, 1);
        assert_eq!(stats.disposals, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashMap;

        const KEYS: [&str; 4] = ["a", "b", "c", "d"];

        #[derive(Clone, Debug)]
        enum Op {
            Insert(usize),
            Get(usize),
            Remove(usize),
            Advance(u64),
            Clear,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..KEYS.len()).prop_map(Op::Insert),
                (0..KEYS.len()).prop_map(Op::Get),
                (0..KEYS.len()).prop_map(Op::Remove),
                (0..40u64).prop_map(Op::Advance),
                Just(Op::Clear),
            ]
        }

        proptest! {
            #[test]
            fn prop_every_resource_disposed_exactly_once(
                ops in proptest::collection::vec(op_strategy(), 0..64)
            ) {
                let (mut cache, clock, released) = make_cache(30, 10);
                let mut model: HashMap<String, u32> = HashMap::new();
                let mut inserted = Vec::new();
                let mut next_id = 0u32;
                let mut seen = 0;

                for op in ops {
                    match op {
                        Op::Insert(k) => {
                            next_id += 1;
                            cache.insert(KEYS[k], next_id);
                            model.insert(KEYS[k].to_string(), next_id);
                            inserted.push(next_id);
                        }
                        Op::Get(k) => {
                            let got = cache.get(KEYS[k]).ok().copied();
                            prop_assert_eq!(got, model.get(KEYS[k]).copied());
                        }
                        Op::Remove(k) => {
                            cache.remove(KEYS[k]);
                            model.remove(KEYS[k]);
                        }
                        Op::Advance(n) => {
                            clock.advance(n);
                        }
                        Op::Clear => {
                            cache.clear();
                            model.clear();
                        }
                    }

                    // Evictions surface only through the disposal log.
                    let evicted: Vec<(String, u32)> = released.lock()[seen..].to_vec();
                    seen += evicted.len();
                    for (key, id) in evicted {
                        if model.get(&key) == Some(&id) {
                            model.remove(&key);
                        }
                    }

                    for key in KEYS {
                        prop_assert_eq!(cache.has(key), model.contains_key(key));
                        prop_assert_eq!(cache.peek(key).copied(), model.get(key).copied());
                    }
                }

                drop(cache);
                let mut disposed: Vec<u32> = released.lock().iter().map(|(_, id)| *id).collect();
                disposed.sort_unstable();
                prop_assert_eq!(disposed, inserted);
            }
        }
    }
}

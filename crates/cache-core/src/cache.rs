use crate::config::{CacheConfig, Loader, Weigher};
use crate::entry::Entry;
use crate::error::CacheError;
use crate::event::AccessEvent;
use crate::expiration::ExpirationEngine;
#[cfg(debug_assertions)]
use crate::invariants::debug_assert_size_bound;
use crate::listener::{dispatch, CacheEventListener, EvictCause, RemovalCause};
use crate::load::LoadCoordinator;
use crate::maintenance::MaintenanceWorker;
use crate::policy::{build_policy, EvictionPolicy};
use crate::refresh::RefreshScheduler;
use crate::ring_config::RingConfig;
use crate::stats::{CacheStats, StatsRecorder};
use crate::store::EntryStore;
use crate::striped::StripedRingBuffer;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Bounded per-tick work caps for the maintenance task (spec.md §4.5/§4.6:
/// "capped at e.g. 1024 per tick" / "batches of at most 1024").
const MAINTENANCE_BATCH_CAP: usize = 1024;

/// Concurrent, in-process key-value cache with Window-TinyLFU admission,
/// size/weight bounds, time-based expiration and refresh, and load
/// coalescing, per spec.md.
///
/// Cheap to clone: every clone shares the same underlying store and
/// maintenance task, and the task itself shuts down once the last clone (and
/// its `Arc`) is dropped.
pub struct Cache<K, V> {
    inner: Arc<CacheInner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct CacheInner<K, V> {
    store: EntryStore<K, V>,
    events: StripedRingBuffer<AccessEvent<K>>,
    policy: Mutex<Box<dyn EvictionPolicy<K>>>,
    expiration: ExpirationEngine<K>,
    refresh: RefreshScheduler<K>,
    load_coordinator: LoadCoordinator<K, V>,
    stats: StatsRecorder,
    listeners: Vec<Arc<dyn CacheEventListener<K, V>>>,
    loader: Option<Loader<K, V>>,
    weigher: Option<Weigher<K, V>>,
    maximum_size: Option<u64>,
    maximum_weight: Option<u64>,
    current_weight: AtomicU64,
    version_counter: AtomicU64,
    read_only: bool,
    clock: quanta::Clock,
    start: quanta::Instant,
    // Populated right after construction; `Weak` self-reference in the
    // maintenance closure avoids a reference cycle that would keep the
    // worker (and thus the thread) alive forever.
    maintenance: Mutex<Option<MaintenanceWorker>>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig<K, V>) -> Result<Self, CacheError> {
        let config = config.build()?;
        let concurrency = config.resolved_concurrency_level();

        let store = EntryStore::new(concurrency, config.initial_capacity);
        let events = StripedRingBuffer::new(
            RingConfig::default(),
            concurrency.min(8).max(1),
            (concurrency * 4).max(8),
            16,
        );
        let policy = build_policy::<K>(&config.eviction_policy, config.maximum_size.unwrap_or(1024));
        let expiration = ExpirationEngine::new(
            config.expire_after_write,
            config.expire_after_access,
            MAINTENANCE_BATCH_CAP,
        );
        let refresh = RefreshScheduler::new(config.refresh_after_write);
        let clock = quanta::Clock::new();
        let start = clock.now();

        let inner = Arc::new(CacheInner {
            store,
            events,
            policy: Mutex::new(policy),
            expiration,
            refresh,
            load_coordinator: LoadCoordinator::new(),
            stats: StatsRecorder::new(config.record_stats),
            listeners: config.listeners,
            loader: config.loader,
            weigher: config.weigher,
            maximum_size: config.maximum_size,
            maximum_weight: config.maximum_weight,
            current_weight: AtomicU64::new(0),
            version_counter: AtomicU64::new(0),
            read_only: config.read_only,
            clock,
            start,
            maintenance: Mutex::new(None),
        });

        let weak: Weak<CacheInner<K, V>> = Arc::downgrade(&inner);
        let worker = MaintenanceWorker::spawn(config.maintenance_interval, move || {
            if let Some(inner) = weak.upgrade() {
                inner.maintenance_tick();
            }
        });
        *inner.maintenance.lock() = Some(worker);

        Ok(Self { inner })
    }

    /// Returns a clone of the value for `key`, or `None` on a miss (absent,
    /// or lazily-detected-expired).
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Membership check that does not record hit/miss statistics, per
    /// spec.md §4.9.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the cached value for `key`, loading it via `loader` on a miss.
    /// Concurrent callers for the same missing key share one invocation.
    pub fn get_or_load(&self, key: &K, loader: impl FnOnce() -> Result<V, String>) -> Result<V, CacheError> {
        self.inner.get_or_load(key, loader)
    }

    /// Like `get_or_load`, but uses the `Loader` configured on this cache.
    /// Fails with `CacheError::InvariantViolation` if none was configured.
    pub fn get_with_configured_loader(&self, key: &K) -> Result<V, CacheError> {
        let loader = self
            .inner
            .loader
            .clone()
            .ok_or_else(|| CacheError::InvariantViolation("no loader configured".to_string()))?;
        let key_for_loader = key.clone();
        self.get_or_load(key, move || loader(&key_for_loader))
    }

    pub fn put(&self, key: K, value: V) -> Result<(), CacheError> {
        self.inner.put(key, value)
    }

    pub fn remove(&self, key: &K) -> Result<Option<V>, CacheError> {
        self.inner.remove(key, RemovalCause::Explicit)
    }

    /// Alias for `remove`, matching common cache-API naming.
    pub fn invalidate(&self, key: &K) -> Result<Option<V>, CacheError> {
        self.remove(key)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.inner.clear()
    }

    /// Alias for `clear`.
    pub fn invalidate_all(&self) -> Result<(), CacheError> {
        self.clear()
    }

    pub fn size(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }

    /// Weakly consistent snapshot of all keys currently present.
    pub fn keys(&self) -> Vec<K> {
        self.inner.store.snapshot_keys()
    }

    /// Weakly consistent snapshot of all values currently present.
    pub fn values(&self) -> Vec<V> {
        self.inner.store.snapshot_entries().into_iter().map(|(_, e)| e.value.clone()).collect()
    }

    /// Weakly consistent snapshot of all `(key, value)` pairs currently
    /// present.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .store
            .snapshot_entries()
            .into_iter()
            .map(|(k, e)| (k, e.value.clone()))
            .collect()
    }
}

impl<K, V> CacheInner<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn now_nanos(&self) -> u64 {
        self.clock.now().duration_since(self.start).as_nanos() as u64
    }

    fn weight_of(&self, key: &K, value: &V) -> u32 {
        self.weigher.as_ref().map(|w| w(key, value)).unwrap_or(1)
    }

    fn get(&self, key: &K) -> Option<V> {
        let Some(entry) = self.store.get(key) else {
            self.stats.record_miss();
            return None;
        };

        let now = self.now_nanos();
        if self.expiration.is_expired(&entry, now) {
            if self.store.remove_if_same(key, &entry) {
                for listener in &self.listeners {
                    let key = key.clone();
                    let value = entry.value.clone();
                    dispatch("on_expire", move || listener.on_expire(&key, &value));
                }
            }
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        let _ = self.events.record(AccessEvent {
            key: key.clone(),
            weight: entry.weight,
            at_nanos: now,
            version: entry.version,
        });
        Some(entry.value.clone())
    }

    fn contains_key(&self, key: &K) -> bool {
        let Some(entry) = self.store.get(key) else { return false };
        !self.expiration.is_expired(&entry, self.now_nanos())
    }

    fn get_or_load(&self, key: &K, loader: impl FnOnce() -> Result<V, String>) -> Result<V, CacheError> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let start = self.clock.now();
        let result = self.load_coordinator.get_or_load(key, loader);
        let elapsed_nanos = self.clock.now().duration_since(start).as_nanos() as u64;

        match result {
            Ok(value) => {
                self.stats.record_load_success(elapsed_nanos);
                self.put(key.clone(), value.clone())?;
                for listener in &self.listeners {
                    let key = key.clone();
                    let value = value.clone();
                    dispatch("on_load", move || listener.on_load(&key, &value));
                }
                Ok(value)
            }
            Err(message) => {
                self.stats.record_load_failure(elapsed_nanos);
                Err(CacheError::LoadFailure(message))
            }
        }
    }

    fn put(&self, key: K, value: V) -> Result<(), CacheError> {
        if self.read_only {
            return Err(CacheError::ReadOnly);
        }

        let weight = self.weight_of(&key, &value);
        let now = self.now_nanos();
        let version = self.version_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let is_new = !self.store.contains_key(&key);

        let entry = Entry::new(value.clone(), weight, now, version);
        let prior = self.store.put(key.clone(), entry);

        if let Some(prior) = &prior {
            self.current_weight.fetch_sub(prior.weight as u64, Ordering::Relaxed);
        }
        self.current_weight.fetch_add(weight as u64, Ordering::Relaxed);
        self.refresh.schedule(key.clone(), now);

        {
            let mut policy = self.policy.lock();
            policy.update(key.clone(), weight, is_new);
            self.enforce_bounds(&mut policy);
        }

        if let Some(prior) = prior {
            for listener in &self.listeners {
                let key = key.clone();
                let prior_value = prior.value.clone();
                dispatch("on_remove", move || listener.on_remove(&key, &prior_value, RemovalCause::Replaced));
            }
        }

        for listener in &self.listeners {
            let key = key.clone();
            let value = value.clone();
            dispatch("on_put", move || listener.on_put(&key, &value));
        }

        Ok(())
    }

    /// Evicts victims until both the size and weight bounds are satisfied,
    /// per spec.md §4.9. A `select_victim` returning `None` while a bound is
    /// still violated is a fatal invariant breach (spec.md §4.11).
    fn enforce_bounds(&self, policy: &mut Box<dyn EvictionPolicy<K>>) {
        loop {
            let over_size = self.maximum_size.is_some_and(|max| self.store.len() as u64 > max);
            let over_weight = self
                .maximum_weight
                .is_some_and(|max| self.current_weight.load(Ordering::Relaxed) > max);
            if !over_size && !over_weight {
                break;
            }

            let Some(victim_key) = policy.select_victim() else {
                tracing::error!("eviction policy has no victim to offer while a capacity bound is violated");
                break;
            };

            let Some(victim_entry) = self.store.remove(&victim_key) else {
                // Already gone (e.g. concurrently removed); nothing to charge back.
                continue;
            };

            self.current_weight.fetch_sub(victim_entry.weight as u64, Ordering::Relaxed);
            self.stats.record_eviction();

            let cause = if over_weight && !over_size { EvictCause::Weight } else { EvictCause::Size };
            for listener in &self.listeners {
                let key = victim_key.clone();
                let value = victim_entry.value.clone();
                dispatch("on_evict", move || listener.on_evict(&key, &value, cause));
            }
        }

        #[cfg(debug_assertions)]
        if let Some(max) = self.maximum_size {
            debug_assert_size_bound!(self.store.len() as u64, max);
        }
    }

    fn remove(&self, key: &K, cause: RemovalCause) -> Result<Option<V>, CacheError> {
        if self.read_only {
            return Err(CacheError::ReadOnly);
        }

        let Some(entry) = self.store.remove(key) else {
            return Ok(None);
        };
        self.current_weight.fetch_sub(entry.weight as u64, Ordering::Relaxed);
        self.policy.lock().remove(key);

        for listener in &self.listeners {
            let key = key.clone();
            let value = entry.value.clone();
            dispatch("on_remove", move || listener.on_remove(&key, &value, cause));
        }

        Ok(Some(entry.value.clone()))
    }

    fn clear(&self) -> Result<(), CacheError> {
        if self.read_only {
            return Err(CacheError::ReadOnly);
        }

        self.store.clear();
        self.policy.lock().clear();
        self.current_weight.store(0, Ordering::Relaxed);

        for listener in &self.listeners {
            dispatch("on_clear", || listener.on_clear());
        }

        Ok(())
    }

    /// Runs one bounded iteration of the maintenance task: drain access
    /// events into the policy, sweep expired entries, process due refresh
    /// deadlines. Always called from the single maintenance thread, per
    /// spec.md §5.
    fn maintenance_tick(&self) {
        self.drain_access_events();
        self.sweep_expired();
        self.process_refresh_deadlines();
    }

    fn drain_access_events(&self) {
        let store = &self.store;
        let policy = &self.policy;
        self.events.drain_up_to(MAINTENANCE_BATCH_CAP, |event: &AccessEvent<K>| {
            if let Some(entry) = store.get(&event.key) {
                // The key may have been removed and reinserted since this
                // event was recorded; only apply it if it's still the same
                // entry identity, per spec.md §3's drainer invariant.
                if entry.version != event.version {
                    return;
                }
                entry.apply_access(event.at_nanos);
                policy.lock().update(event.key.clone(), event.weight, false);
            }
        });
    }

    fn sweep_expired(&self) {
        let now = self.now_nanos();
        let expired = self.expiration.sweep(&self.store, now);
        if expired.is_empty() {
            return;
        }
        let mut policy = self.policy.lock();
        for (key, entry) in expired {
            policy.remove(&key);
            self.current_weight.fetch_sub(entry.weight as u64, Ordering::Relaxed);
            for listener in &self.listeners {
                let key = key.clone();
                let value = entry.value.clone();
                dispatch("on_expire", move || listener.on_expire(&key, &value));
            }
        }
    }

    fn process_refresh_deadlines(&self) {
        if !self.refresh.is_enabled() {
            return;
        }
        let now = self.now_nanos();
        let due = self.refresh.drain_due(now, MAINTENANCE_BATCH_CAP);
        let Some(loader) = &self.loader else { return };

        for key in due {
            let Some(entry) = self.store.get(&key) else { continue };
            if self.expiration.is_expired(&entry, now) {
                continue;
            }
            let expected_version = entry.version;

            let start = self.clock.now();
            let load_result = loader(&key);
            let elapsed_nanos = self.clock.now().duration_since(start).as_nanos() as u64;

            match load_result {
                Ok(new_value) => {
                    self.stats.record_load_success(elapsed_nanos);

                    // Drop the reload if a concurrent write raced us; the
                    // newer write already supersedes this result
                    // (SPEC_FULL.md refresh/version-conflict resolution).
                    let Some(current) = self.store.get(&key) else { continue };
                    if current.version != expected_version {
                        continue;
                    }
                    let weight = self.weight_of(&key, &new_value);
                    let now = self.now_nanos();
                    let version = self.version_counter.fetch_add(1, Ordering::Relaxed) + 1;
                    let new_entry = Entry::new(new_value.clone(), weight, now, version);
                    if let Some(prior) = self.store.put(key.clone(), new_entry) {
                        self.current_weight.fetch_sub(prior.weight as u64, Ordering::Relaxed);
                    }
                    self.current_weight.fetch_add(weight as u64, Ordering::Relaxed);
                    self.refresh.schedule(key.clone(), now);

                    for listener in &self.listeners {
                        let key = key.clone();
                        let value = new_value.clone();
                        dispatch("on_load", move || listener.on_load(&key, &value));
                    }
                }
                Err(_) => {
                    self.stats.record_load_failure(elapsed_nanos);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_config() -> CacheConfig<i32, i32> {
        CacheConfig::new().with_maximum_size(3).with_maintenance_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_put_then_get() {
        let cache: Cache<i32, i32> = Cache::new(test_config()).unwrap();
        cache.put(1, 100).unwrap();
        assert_eq!(cache.get(&1), Some(100));
        assert_eq!(cache.stats().hit_count(), 1);
    }

    #[test]
    fn test_get_miss_records_stat() {
        let cache: Cache<i32, i32> = Cache::new(test_config()).unwrap();
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.stats().miss_count(), 1);
    }

    #[test]
    fn test_eviction_restores_size_bound() {
        let cache: Cache<i32, i32> = Cache::new(test_config()).unwrap();
        for k in 0..10 {
            cache.put(k, k).unwrap();
        }
        assert!(cache.size() <= 3);
        assert!(cache.stats().eviction_count() > 0);
    }

    #[test]
    fn test_remove_then_get_is_a_miss() {
        let cache: Cache<i32, i32> = Cache::new(test_config()).unwrap();
        cache.put(1, 100).unwrap();
        assert_eq!(cache.remove(&1).unwrap(), Some(100));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_clear_empties_the_cache() {
        let cache: Cache<i32, i32> = Cache::new(test_config()).unwrap();
        cache.put(1, 1).unwrap();
        cache.put(2, 2).unwrap();
        cache.clear().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let config = CacheConfig::<i32, i32>::new().with_read_only(true);
        let cache = Cache::new(config).unwrap();
        assert!(matches!(cache.put(1, 1), Err(CacheError::ReadOnly)));
    }

    #[test]
    fn test_expire_after_write() {
        let config = CacheConfig::<i32, i32>::new()
            .with_expire_after_write(Duration::from_millis(10))
            .with_maintenance_interval(Duration::from_millis(2));
        let cache = Cache::new(config).unwrap();
        cache.put(1, 1).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_get_or_load_coalesces_concurrent_misses() {
        let cache: Arc<Cache<i32, i32>> = Arc::new(Cache::new(test_config()).unwrap());
        let invocations = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let invocations = Arc::clone(&invocations);
                std::thread::spawn(move || {
                    cache.get_or_load(&42, || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(10));
                        Ok(999)
                    })
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), 999);
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_on_put_and_on_remove_fire() {
        struct Recorder {
            puts: AtomicUsize,
            removes: AtomicUsize,
        }
        impl CacheEventListener<i32, i32> for Recorder {
            fn on_put(&self, _key: &i32, _value: &i32) {
                self.puts.fetch_add(1, Ordering::SeqCst);
            }
            fn on_remove(&self, _key: &i32, _value: &i32, _cause: RemovalCause) {
                self.removes.fetch_add(1, Ordering::SeqCst);
            }
        }
        let recorder = Arc::new(Recorder { puts: AtomicUsize::new(0), removes: AtomicUsize::new(0) });
        let config = test_config().with_listener(recorder.clone());
        let cache = Cache::new(config).unwrap();
        cache.put(1, 1).unwrap();
        cache.remove(&1).unwrap();
        assert_eq!(recorder.puts.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.removes.load(Ordering::SeqCst), 1);
    }
}

use crate::entry::Entry;
use crate::store::EntryStore;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Bounded opportunistic expiration sweep, per spec.md §4.5.
///
/// Expiry is also checked lazily on every `get` (see `Entry::is_expired`,
/// called directly from the cache's read path) — this engine only drives
/// the maintenance task's periodic sweep, so correctness never depends on
/// the sweep's cadence, only on eventually reclaiming dead entries.
pub(crate) struct ExpirationEngine<K> {
    expire_after_write: Option<Duration>,
    expire_after_access: Option<Duration>,
    sweep_batch_size: usize,
    /// Round-robin cursor over keys, refilled from a store snapshot whenever
    /// it runs dry. Avoids re-scanning the whole store every tick.
    cursor: Mutex<VecDeque<K>>,
}

impl<K: Hash + Eq + Clone> ExpirationEngine<K> {
    pub fn new(
        expire_after_write: Option<Duration>,
        expire_after_access: Option<Duration>,
        sweep_batch_size: usize,
    ) -> Self {
        Self {
            expire_after_write,
            expire_after_access,
            sweep_batch_size: sweep_batch_size.max(1),
            cursor: Mutex::new(VecDeque::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.expire_after_write.is_some() || self.expire_after_access.is_some()
    }

    pub fn is_expired<V>(&self, entry: &Entry<V>, now_nanos: u64) -> bool {
        entry.is_expired(now_nanos, self.expire_after_write, self.expire_after_access)
    }

    /// Scans up to `sweep_batch_size` keys, removing any that have expired.
    /// Returns the removed `(key, entry)` pairs so the caller can fire
    /// `on_expire` and update stats.
    pub fn sweep<V>(&self, store: &EntryStore<K, V>, now_nanos: u64) -> Vec<(K, Arc<Entry<V>>)> {
        if !self.is_enabled() {
            return Vec::new();
        }

        let mut cursor = self.cursor.lock();
        if cursor.is_empty() {
            cursor.extend(store.snapshot_keys());
        }

        let mut expired = Vec::new();
        let mut scanned = 0usize;
        while scanned < self.sweep_batch_size {
            let Some(key) = cursor.pop_front() else { break };
            scanned += 1;
            if let Some(entry) = store.get(&key) {
                if self.is_expired(&entry, now_nanos) && store.remove_if_same(&key, &entry) {
                    expired.push((key, entry));
                }
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(v: i32, created_nanos: u64) -> Entry<i32> {
        Entry::new(v, 1, created_nanos, 0)
    }

    #[test]
    fn test_disabled_engine_never_expires() {
        let engine: ExpirationEngine<&str> = ExpirationEngine::new(None, None, 1024);
        assert!(!engine.is_expired(&entry(1, 0), 1_000_000_000));
    }

    #[test]
    fn test_expire_after_write() {
        let engine: ExpirationEngine<&str> = ExpirationEngine::new(Some(Duration::from_millis(10)), None, 1024);
        let e = entry(1, 0);
        assert!(!engine.is_expired(&e, Duration::from_millis(5).as_nanos() as u64));
        assert!(engine.is_expired(&e, Duration::from_millis(20).as_nanos() as u64));
    }

    #[test]
    fn test_sweep_removes_expired_entries() {
        let engine: ExpirationEngine<&str> =
            ExpirationEngine::new(Some(Duration::from_nanos(100)), None, 1024);
        let store: EntryStore<&str, i32> = EntryStore::new(4, None);
        store.put("a", entry(1, 0));
        store.put("b", entry(2, 0));

        let expired = engine.sweep(&store, 1_000);
        assert_eq!(expired.len(), 2);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_sweep_respects_batch_size() {
        let engine: ExpirationEngine<i32> =
            ExpirationEngine::new(Some(Duration::from_nanos(1)), None, 2);
        let store: EntryStore<i32, i32> = EntryStore::new(4, None);
        for k in 0..10 {
            store.put(k, entry(k, 0));
        }
        let expired = engine.sweep(&store, 1_000_000);
        assert_eq!(expired.len(), 2);
    }
}

use crate::entry::Entry;
use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// Concurrent map from key to `Entry`, sharded into a power-of-two count of
/// independently-locked segments, per spec.md §4.4.
///
/// Each shard is a plain `HashMap` behind a `parking_lot::RwLock` — short
/// critical sections, no lock held across a policy update (those happen only
/// on the maintenance task after draining the access-event rings).
pub struct EntryStore<K, V> {
    shards: Box<[RwLock<HashMap<K, Arc<Entry<V>>>>]>,
    shard_mask: u64,
    hasher: RandomState,
}

impl<K, V> EntryStore<K, V>
where
    K: Hash + Eq + Clone,
{
    /// `concurrency_level` is rounded up to the next power of two and used
    /// directly as the shard count (spec.md bounds the resolved value to
    /// `[1, 32]` before it reaches here — see `CacheConfig::resolved_concurrency_level`).
    pub fn new(concurrency_level: usize, initial_capacity: Option<u32>) -> Self {
        let shard_count = concurrency_level.max(1).next_power_of_two();
        let per_shard_capacity = initial_capacity
            .map(|c| (c as usize / shard_count).max(1))
            .unwrap_or(0);

        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::with_capacity(per_shard_capacity)))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            shard_mask: (shard_count - 1) as u64,
            hasher: RandomState::new(),
        }
    }

    #[inline]
    fn shard_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) & self.shard_mask) as usize
    }

    #[inline]
    fn shard(&self, key: &K) -> &RwLock<HashMap<K, Arc<Entry<V>>>> {
        &self.shards[self.shard_index(key)]
    }

    pub fn get(&self, key: &K) -> Option<Arc<Entry<V>>> {
        self.shard(key).read().get(key).cloned()
    }

    /// Inserts or replaces the entry for `key`, returning the prior entry if
    /// any (spec.md §4.10: Live → Live on update, prior entry transitions to
    /// Removed).
    pub fn put(&self, key: K, entry: Entry<V>) -> Option<Arc<Entry<V>>> {
        self.shard(&key).write().insert(key, Arc::new(entry))
    }

    pub fn remove(&self, key: &K) -> Option<Arc<Entry<V>>> {
        self.shard(key).write().remove(key)
    }

    /// Removes `key` only if the currently-stored entry is `expected`
    /// (pointer-equal), per spec.md §4.4's "expiration at read time" clause:
    /// a concurrent overwrite between the expiration check and the remove
    /// must preserve the newer entry instead of being clobbered.
    pub fn remove_if_same(&self, key: &K, expected: &Arc<Entry<V>>) -> bool {
        let mut shard = self.shard(key).write();
        if let Some(current) = shard.get(key) {
            if Arc::ptr_eq(current, expected) {
                shard.remove(key);
                return true;
            }
        }
        false
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Total entry count across all shards; approximate under concurrent
    /// mutation, as spec.md §6 allows for `size()`.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry in every shard; used by `clear()`.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().clear();
        }
    }

    /// Weakly-consistent point-in-time snapshot of all keys (spec.md §4.9):
    /// no whole-store lock, reflects entries present at some moment during
    /// the call.
    pub fn snapshot_keys(&self) -> Vec<K> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            out.extend(shard.read().keys().cloned());
        }
        out
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Weakly-consistent point-in-time snapshot of all `(key, entry)` pairs,
    /// backing `values()`/`entries()`.
    pub fn snapshot_entries(&self) -> Vec<(K, Arc<Entry<V>>)> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            out.extend(shard.read().iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        }
        out
    }
}

/// Reason an entry left the cache through a non-explicit path.
///
/// Distinguished from `RemovalCause` so the `eviction_count` stat (spec.md
/// §8: "monotone eviction_count") only counts capacity/expiry-driven
/// removals, never an explicit `remove`/`clear`/replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictCause {
    /// The policy selected this entry as a victim to restore the size bound.
    Size,
    /// The policy selected this entry as a victim to restore the weight bound.
    Weight,
    /// The entry's expiration predicate held at the time it was touched.
    Expired,
}

/// Reason an entry left the cache, covering both eviction and explicit paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Removed by the policy to restore an invariant; see `EvictCause`.
    Evicted(EvictCause),
    /// Removed by an explicit `remove`/`invalidate` call.
    Explicit,
    /// Replaced by a `put` for the same key.
    Replaced,
    /// Removed by `clear`/`invalidate_all`.
    Cleared,
}

/// Best-effort notification sink for cache lifecycle events.
///
/// Per spec.md §4.11, listener errors (here: panics caught at the dispatch
/// site) are swallowed and logged; they never affect store state. All
/// methods default to no-ops so implementors only override what they need.
pub trait CacheEventListener<K, V>: Send + Sync {
    fn on_put(&self, _key: &K, _value: &V) {}
    fn on_remove(&self, _key: &K, _value: &V, _cause: RemovalCause) {}
    fn on_evict(&self, _key: &K, _value: &V, _cause: EvictCause) {}
    fn on_expire(&self, _key: &K, _value: &V) {}
    fn on_load(&self, _key: &K, _value: &V) {}
    fn on_clear(&self) {}
}

pub(crate) fn dispatch<F>(name: &'static str, f: F)
where
    F: FnOnce() + std::panic::UnwindSafe,
{
    if let Err(panic) = std::panic::catch_unwind(f) {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::warn!(listener = name, %message, "cache event listener panicked");
    }
}

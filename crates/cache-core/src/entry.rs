use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A single stored value plus the bookkeeping spec.md §3 assigns to an entry.
///
/// Owned by exactly one shard; lives from a successful insert until
/// eviction, removal, expiration, or `clear`.
#[derive(Debug)]
pub struct Entry<V> {
    pub value: V,
    pub weight: u32,
    pub creation_time_nanos: u64,
    last_access_time_nanos: AtomicU64,
    access_count: AtomicU64,
    /// Increments on each update; the refresh scheduler compares this against
    /// the version it captured when scheduling, dropping stale reloads
    /// (SPEC_FULL.md §4, Open Question 2).
    pub version: u64,
}

impl<V> Entry<V> {
    pub fn new(value: V, weight: u32, now_nanos: u64, version: u64) -> Self {
        Self {
            value,
            weight,
            creation_time_nanos: now_nanos,
            last_access_time_nanos: AtomicU64::new(now_nanos),
            access_count: AtomicU64::new(0),
            version,
        }
    }

    #[inline]
    pub fn last_access_time_nanos(&self) -> u64 {
        self.last_access_time_nanos.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Applied by the maintenance task when it drains an access event for
    /// this entry; per spec.md's resolution, this is the only writer of
    /// access-time/count, so reads remain lazily-fresh rather than
    /// synchronously updated on every `get`.
    pub(crate) fn apply_access(&self, at_nanos: u64) {
        self.last_access_time_nanos.store(at_nanos, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether this entry is expired given the configured durations and the
    /// current time, per spec.md §3's `expired` derived view.
    pub fn is_expired(
        &self,
        now_nanos: u64,
        expire_after_write: Option<Duration>,
        expire_after_access: Option<Duration>,
    ) -> bool {
        if let Some(d) = expire_after_write {
            if now_nanos.saturating_sub(self.creation_time_nanos) > d.as_nanos() as u64 {
                return true;
            }
        }
        if let Some(d) = expire_after_access {
            if now_nanos.saturating_sub(self.last_access_time_nanos()) > d.as_nanos() as u64 {
                return true;
            }
        }
        false
    }
}

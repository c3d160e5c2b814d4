/// A `get` hit, enqueued onto the striped ring buffer so the maintenance
/// task can apply it off the read path.
///
/// Inserts and removals update the policy synchronously (see `Cache::put`)
/// since they already hold a short policy lock to enforce the size/weight
/// bound; only the far more frequent hit path is deferred, which is the
/// contention this ring buffer exists to avoid (spec.md §5).
///
/// Carries the entry's `version` at the time of the hit so the drainer can
/// detect a remove-then-reinsert race and skip applying the stale event to
/// the new entry (spec.md §3's entry-identity invariant).
#[derive(Debug, Clone)]
pub(crate) struct AccessEvent<K> {
    pub key: K,
    pub weight: u32,
    pub at_nanos: u64,
    pub version: u64,
}

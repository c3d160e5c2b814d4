use std::sync::atomic::{AtomicU64, Ordering};

/// Hit/miss/load/eviction counters, per spec.md §4.7.
///
/// Counters are plain atomic 64-bit integers rather than the teacher's
/// `RingMetrics` (which amortizes over batches): stats updates happen once
/// per `get`/`put`/eviction on the hot path, not per-ring-slot, so a single
/// `fetch_add` is already the cheapest correct option.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    enabled: bool,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    load_success_count: AtomicU64,
    load_failure_count: AtomicU64,
    load_time_total_nanos: AtomicU64,
    eviction_count: AtomicU64,
}

impl StatsRecorder {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        if self.enabled {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_miss(&self) {
        if self.enabled {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_load_success(&self, elapsed_nanos: u64) {
        if self.enabled {
            self.load_success_count.fetch_add(1, Ordering::Relaxed);
            self.load_time_total_nanos.fetch_add(elapsed_nanos, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_load_failure(&self, elapsed_nanos: u64) {
        if self.enabled {
            self.load_failure_count.fetch_add(1, Ordering::Relaxed);
            self.load_time_total_nanos.fetch_add(elapsed_nanos, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_eviction(&self) {
        if self.enabled {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            load_success_count: self.load_success_count.load(Ordering::Relaxed),
            load_failure_count: self.load_failure_count.load(Ordering::Relaxed),
            load_time_total_nanos: self.load_time_total_nanos.load(Ordering::Relaxed),
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time, monotonic-within-a-cache's-lifetime statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    hit_count: u64,
    miss_count: u64,
    load_success_count: u64,
    load_failure_count: u64,
    load_time_total_nanos: u64,
    eviction_count: u64,
}

impl CacheStats {
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }

    pub fn request_count(&self) -> u64 {
        self.hit_count.saturating_add(self.miss_count)
    }

    pub fn hit_rate(&self) -> f64 {
        let req = self.request_count();
        if req == 0 {
            1.0
        } else {
            self.hit_count as f64 / req as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        let req = self.request_count();
        if req == 0 {
            0.0
        } else {
            self.miss_count as f64 / req as f64
        }
    }

    pub fn load_count(&self) -> u64 {
        self.load_success_count.saturating_add(self.load_failure_count)
    }

    pub fn load_failure_count(&self) -> u64 {
        self.load_failure_count
    }

    pub fn load_time_total_nanos(&self) -> u64 {
        self.load_time_total_nanos
    }

    pub fn average_load_penalty_nanos(&self) -> f64 {
        let load_count = self.load_count();
        if load_count == 0 {
            0.0
        } else {
            self.load_time_total_nanos as f64 / load_count as f64
        }
    }

    pub fn eviction_count(&self) -> u64 {
        self.eviction_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_recorder_is_a_no_op() {
        let stats = StatsRecorder::new(false);
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.snapshot().request_count(), 0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = StatsRecorder::new(true);
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        let snap = stats.snapshot();
        assert_eq!(snap.hit_count(), 2);
        assert_eq!(snap.miss_count(), 1);
        assert!((snap.hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }
}

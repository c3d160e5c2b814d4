//! Configuration for the async cache handle.

use std::time::Duration;

/// Configuration for `CacheAsync`'s wrapper behavior, layered on top of a
/// `cache_core::CacheConfig`.
#[derive(Debug, Clone)]
pub struct AsyncCacheConfig {
    /// How long `shutdown()` waits for in-flight `get_or_load` calls to
    /// finish before returning, per spec.md §5: "drains in-flight loads with
    /// a grace period, and then releases resources".
    ///
    /// Default: 5s.
    pub shutdown_grace_period: Duration,

    /// Interval on which blocked `get_or_load` futures re-check for a
    /// deadline or shutdown signal while waiting on the underlying
    /// condition variable (which is synchronous, so the async wrapper polls
    /// it from a blocking task rather than awaiting it directly).
    ///
    /// Default: 5ms.
    pub poll_interval: Duration,
}

impl Default for AsyncCacheConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_period: Duration::from_secs(5),
            poll_interval: Duration::from_millis(5),
        }
    }
}

impl AsyncCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shutdown_grace_period(mut self, d: Duration) -> Self {
        self.shutdown_grace_period = d;
        self
    }

    pub fn with_poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }
}

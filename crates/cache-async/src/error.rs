//! Error types for async cache operations.

use cache_core::CacheError;
use thiserror::Error;

/// Errors surfaced by `cache-async`'s wrapper over `cache_core::CacheError`,
/// per spec.md §7's Timeout/Cancelled kinds plus the underlying cache error.
#[derive(Debug, Error)]
pub enum AsyncCacheError {
    /// The underlying synchronous cache operation failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The deadline passed on `get_or_load` expired before a value arrived.
    /// The in-flight load itself is not cancelled: other waiters (or a
    /// future caller) may still observe its result (spec.md §5: "on expiry,
    /// the caller returns with a timeout error while the load continues for
    /// other waiters").
    #[error("deadline exceeded waiting for load to complete")]
    DeadlineExceeded,

    /// The cache handle was shut down and is no longer accepting operations.
    #[error("cache handle was shut down")]
    ShutDown,
}

impl AsyncCacheError {
    /// Returns `true` if this error reflects a terminal, non-retriable state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ShutDown)
    }
}

//! Async handle over `cache_core::Cache`.
//!
//! `cache-core` is intentionally synchronous (spec.md §1 scopes the async
//! runtime out of the core so it stays usable from non-async callers). This
//! crate adds a thin async surface on top: blocking cache operations are run
//! via `tokio::task::spawn_blocking` so they never stall the async runtime's
//! worker threads, `get_or_load_async` supports deadline cancellation without
//! cancelling the underlying load for other waiters, and `shutdown` drains
//! in-flight loads with a grace period before releasing the handle.

mod config;
mod error;
mod shutdown;

pub use config::AsyncCacheConfig;
pub use error::AsyncCacheError;
pub use shutdown::ShutdownSignal;

use cache_core::{Cache, CacheError};
use shutdown::ShutdownState;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn join_error(e: tokio::task::JoinError) -> AsyncCacheError {
    AsyncCacheError::Cache(CacheError::InvariantViolation(format!(
        "blocking cache task failed: {e}"
    )))
}

/// RAII in-flight counter: incremented on construction, decremented on drop,
/// so `shutdown` can observe how many async calls are still outstanding.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Async wrapper over a `Cache<K, V>`, per SPEC_FULL.md §0's `cache-async`
/// description.
///
/// Cheap to clone: shares the same underlying `Cache` and shutdown state.
#[derive(Clone)]
pub struct CacheAsync<K, V> {
    cache: Cache<K, V>,
    state: Arc<ShutdownState>,
    signal: ShutdownSignal,
    in_flight: Arc<AtomicUsize>,
    config: AsyncCacheConfig,
}

impl<K, V> CacheAsync<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(cache: Cache<K, V>, config: AsyncCacheConfig) -> Self {
        let state = Arc::new(ShutdownState::new());
        let signal = ShutdownSignal::new(Arc::clone(&state), Arc::new(Notify::new()));
        Self {
            cache,
            state,
            signal,
            in_flight: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    /// A cloneable handle that can trigger `shutdown`'s closed state from
    /// outside this `CacheAsync` (e.g. on receipt of an OS signal).
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Direct access to the underlying synchronous cache, for callers that
    /// don't need the async wrapper's blocking-task indirection.
    pub fn inner(&self) -> &Cache<K, V> {
        &self.cache
    }

    fn ensure_open(&self) -> Result<(), AsyncCacheError> {
        if self.state.is_closed() {
            Err(AsyncCacheError::ShutDown)
        } else {
            Ok(())
        }
    }

    pub async fn get_async(&self, key: K) -> Result<Option<V>, AsyncCacheError> {
        self.ensure_open()?;
        let _guard = InFlightGuard::new(Arc::clone(&self.in_flight));
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.get(&key)).await.map_err(join_error)
    }

    pub async fn contains_key_async(&self, key: K) -> Result<bool, AsyncCacheError> {
        self.ensure_open()?;
        let _guard = InFlightGuard::new(Arc::clone(&self.in_flight));
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.contains_key(&key)).await.map_err(join_error)
    }

    pub async fn put_async(&self, key: K, value: V) -> Result<(), AsyncCacheError> {
        self.ensure_open()?;
        let _guard = InFlightGuard::new(Arc::clone(&self.in_flight));
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.put(key, value))
            .await
            .map_err(join_error)?
            .map_err(AsyncCacheError::from)
    }

    pub async fn remove_async(&self, key: K) -> Result<Option<V>, AsyncCacheError> {
        self.ensure_open()?;
        let _guard = InFlightGuard::new(Arc::clone(&self.in_flight));
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.remove(&key))
            .await
            .map_err(join_error)?
            .map_err(AsyncCacheError::from)
    }

    pub async fn clear_async(&self) -> Result<(), AsyncCacheError> {
        self.ensure_open()?;
        let _guard = InFlightGuard::new(Arc::clone(&self.in_flight));
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.clear())
            .await
            .map_err(join_error)?
            .map_err(AsyncCacheError::from)
    }

    /// Like `Cache::get_or_load`, with an optional deadline.
    ///
    /// On expiry the deadline only cancels *this caller's wait*: the loader
    /// keeps running on the blocking threadpool and other waiters (or a
    /// later call for the same key) still observe its result, per spec.md
    /// §5 ("the load continues for other waiters").
    pub async fn get_or_load_async<F>(
        &self,
        key: K,
        loader: F,
        deadline: Option<Duration>,
    ) -> Result<V, AsyncCacheError>
    where
        F: FnOnce() -> Result<V, String> + Send + 'static,
    {
        self.ensure_open()?;
        let _guard = InFlightGuard::new(Arc::clone(&self.in_flight));
        let cache = self.cache.clone();
        let task = tokio::task::spawn_blocking(move || cache.get_or_load(&key, loader));

        let joined = match deadline {
            Some(d) => match tokio::time::timeout(d, task).await {
                Ok(joined) => joined,
                Err(_) => return Err(AsyncCacheError::DeadlineExceeded),
            },
            None => task.await,
        };

        joined.map_err(join_error)?.map_err(AsyncCacheError::from)
    }

    /// Closes the handle to new calls, then waits up to
    /// `config.shutdown_grace_period` for in-flight calls to finish before
    /// returning, per spec.md §5: "drains in-flight loads with a grace
    /// period, and then releases resources".
    pub async fn shutdown(&self) {
        self.signal.shutdown();

        let deadline = tokio::time::Instant::now() + self.config.shutdown_grace_period;
        while self.in_flight.load(Ordering::Acquire) > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(self.config.poll_interval).await;
        }

        let remaining = self.in_flight.load(Ordering::Acquire);
        if remaining > 0 {
            tracing::warn!(remaining, "shutdown grace period elapsed with calls still in flight");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_core::CacheConfig;

    fn test_cache() -> Cache<i32, i32> {
        Cache::new(CacheConfig::new().with_maximum_size(100)).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_async() {
        let handle = CacheAsync::new(test_cache(), AsyncCacheConfig::new());
        handle.put_async(1, 100).await.unwrap();
        assert_eq!(handle.get_async(1).await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn test_remove_async() {
        let handle = CacheAsync::new(test_cache(), AsyncCacheConfig::new());
        handle.put_async(1, 100).await.unwrap();
        assert_eq!(handle.remove_async(1).await.unwrap(), Some(100));
        assert_eq!(handle.get_async(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_or_load_async_shares_one_invocation() {
        use std::sync::atomic::AtomicUsize;
        let handle = Arc::new(CacheAsync::new(test_cache(), AsyncCacheConfig::new()));
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let handle = Arc::clone(&handle);
            let invocations = Arc::clone(&invocations);
            tasks.push(tokio::spawn(async move {
                handle
                    .get_or_load_async(
                        7,
                        move || {
                            invocations.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(10));
                            Ok(42)
                        },
                        None,
                    )
                    .await
            }));
        }
        for t in tasks {
            assert_eq!(t.await.unwrap().unwrap(), 42);
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_load_async_deadline_times_out() {
        let handle = CacheAsync::new(test_cache(), AsyncCacheConfig::new());
        let result = handle
            .get_or_load_async(
                1,
                || {
                    std::thread::sleep(Duration::from_millis(100));
                    Ok(1)
                },
                Some(Duration::from_millis(5)),
            )
            .await;
        assert!(matches!(result, Err(AsyncCacheError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_calls() {
        let handle = CacheAsync::new(test_cache(), AsyncCacheConfig::new());
        handle.shutdown().await;
        assert!(matches!(handle.put_async(1, 1).await, Err(AsyncCacheError::ShutDown)));
    }
}

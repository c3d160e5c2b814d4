use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

enum LoadState<V> {
    Pending,
    Done(Result<V, String>),
}

struct LoadSlot<V> {
    state: Mutex<LoadState<V>>,
    condvar: Condvar,
}

/// Coalesces concurrent `get_or_load` callers for the same missing key into
/// a single loader invocation, per spec.md §4.8.
///
/// The first caller to register a key becomes the "leader" and runs the
/// loader; every other caller for that key blocks on the same slot and
/// observes the leader's result (success or failure) rather than invoking
/// the loader itself.
pub(crate) struct LoadCoordinator<K, V> {
    in_flight: Mutex<HashMap<K, Arc<LoadSlot<V>>>>,
}

impl<K: Hash + Eq + Clone, V: Clone> LoadCoordinator<K, V> {
    pub fn new() -> Self {
        Self { in_flight: Mutex::new(HashMap::new()) }
    }

    /// Runs `loader` for `key` if no load is already in flight; otherwise
    /// blocks until the in-flight load completes and returns its result.
    pub fn get_or_load<F>(&self, key: &K, loader: F) -> Result<V, String>
    where
        F: FnOnce() -> Result<V, String>,
    {
        let (slot, is_leader) = {
            let mut in_flight = self.in_flight.lock();
            if let Some(existing) = in_flight.get(key) {
                (Arc::clone(existing), false)
            } else {
                let slot = Arc::new(LoadSlot {
                    state: Mutex::new(LoadState::Pending),
                    condvar: Condvar::new(),
                });
                in_flight.insert(key.clone(), Arc::clone(&slot));
                (slot, true)
            }
        };

        if is_leader {
            let result = loader();
            {
                let mut state = slot.state.lock();
                *state = LoadState::Done(result.clone());
            }
            slot.condvar.notify_all();
            self.in_flight.lock().remove(key);
            result
        } else {
            let mut state = slot.state.lock();
            loop {
                match &*state {
                    LoadState::Done(result) => return result.clone(),
                    LoadState::Pending => slot.condvar.wait(&mut state),
                }
            }
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_single_caller_runs_loader() {
        let coordinator: LoadCoordinator<&str, i32> = LoadCoordinator::new();
        let result = coordinator.get_or_load(&"a", || Ok(42));
        assert_eq!(result, Ok(42));
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[test]
    fn test_failure_is_not_cached_as_success() {
        let coordinator: LoadCoordinator<&str, i32> = LoadCoordinator::new();
        let first = coordinator.get_or_load(&"a", || Err("boom".to_string()));
        assert_eq!(first, Err("boom".to_string()));
        let second = coordinator.get_or_load(&"a", || Ok(1));
        assert_eq!(second, Ok(1));
    }

    #[test]
    fn test_concurrent_callers_share_one_invocation() {
        let coordinator: Arc<LoadCoordinator<&str, i32>> = Arc::new(LoadCoordinator::new());
        let invocations = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(10));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let invocations = Arc::clone(&invocations);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    coordinator.get_or_load(&"shared", || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        Ok(7)
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(7));
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }
}

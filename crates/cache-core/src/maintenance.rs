use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Background worker that drives the cache's single maintenance task on a
/// fixed cadence, per spec.md §5: draining the striped ring buffer into the
/// eviction policy, sweeping expired entries, and processing refresh
/// deadlines, all from one thread so the policy and sketch are never touched
/// concurrently by readers.
///
/// Each `tick` is a bounded amount of work (batch caps live in the closure's
/// captured state, not here) so a slow tick never blocks shutdown for long.
pub(crate) struct MaintenanceWorker {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl MaintenanceWorker {
    pub fn spawn<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("cache-maintenance".to_string())
            .spawn(move || {
                while !shutdown_for_thread.load(Ordering::Acquire) {
                    tick();
                    thread::sleep(interval);
                }
                // Run one final tick so work queued right before shutdown
                // (a last refresh deadline, a last batch of access events)
                // isn't silently dropped.
                tick();
            })
            .expect("failed to spawn cache maintenance thread");

        Self { handle: Some(handle), shutdown }
    }

    /// Signals the worker to stop after its current tick and joins it.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MaintenanceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

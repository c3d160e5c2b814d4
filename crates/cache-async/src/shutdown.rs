//! Shutdown utilities for graceful termination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared shutdown state for a `CacheAsync` handle and its clones.
#[derive(Debug)]
pub(crate) struct ShutdownState {
    /// Flag indicating the handle is closed to new calls.
    closed: AtomicBool,
    /// Flag indicating shutdown has been initiated.
    shutdown_initiated: AtomicBool,
}

impl ShutdownState {
    pub(crate) fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    /// Marks the handle as closed to new calls.
    #[inline]
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns `true` if closed to new calls.
    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Initiates shutdown sequence.
    #[inline]
    pub(crate) fn initiate_shutdown(&self) {
        self.shutdown_initiated.store(true, Ordering::Release);
    }

    /// Returns `true` if shutdown has been initiated.
    #[inline]
    pub(crate) fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }
}

/// A cloneable signal for triggering shutdown externally.
///
/// Multiple clones of this handle can trigger shutdown - only the first
/// one has effect, subsequent calls are no-ops.
#[derive(Clone)]
pub struct ShutdownSignal {
    state: Arc<ShutdownState>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    pub(crate) fn new(state: Arc<ShutdownState>, notify: Arc<Notify>) -> Self {
        Self { state, notify }
    }

    /// Triggers graceful shutdown.
    ///
    /// Closes the handle to new calls and wakes anything waiting on the
    /// shutdown notification. Idempotent: calling it more than once has no
    /// effect after the first call.
    pub fn shutdown(&self) {
        if !self.state.is_shutdown_initiated() {
            self.state.initiate_shutdown();
            self.state.close();
            self.notify.notify_waiters();
        }
    }

    /// Returns `true` if shutdown has been initiated.
    pub fn is_shutdown(&self) -> bool {
        self.state.is_shutdown_initiated()
    }
}

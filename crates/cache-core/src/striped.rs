#[cfg(debug_assertions)]
use crate::invariants::debug_assert_fifo_count;
use crate::{Ring, RingConfig};
use ahash::AHasher;
use parking_lot::{Mutex, RwLock};
use std::hash::{Hash, Hasher};
#[cfg(debug_assertions)]
use std::sync::atomic::AtomicU64;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error types for striped-ring-buffer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StripedRingBufferError {
    /// The buffer has been closed and no longer accepts access events.
    #[error("striped ring buffer is closed")]
    Closed,
}

/// A single stripe: a `Ring` plus the mutex that serializes its producer
/// side.
///
/// `Ring<T>` is strictly single-producer (its `reserve`/`commit` protocol
/// reads `tail` with `Relaxed` and publishes with a plain `Release` store —
/// no CAS — relying on exactly one producer handle at a time). Multiple
/// threads can hash to the same stripe, so `producer_lock` makes their
/// `push` calls mutually exclusive: at most one thread is ever inside
/// `Ring::reserve`/`commit` for a given stripe, which restores the
/// single-producer invariant the ring itself assumes rather than trying to
/// make the ring internally multi-producer-safe.
struct Stripe<T> {
    ring: Ring<T>,
    producer_lock: Mutex<()>,
}

impl<T> Stripe<T> {
    fn new(config: RingConfig) -> Self {
        let ring = Ring::new(config);
        ring.set_active(true);
        Self {
            ring,
            producer_lock: Mutex::new(()),
        }
    }

    /// Pushes `item`, serialized against any other thread targeting this
    /// stripe.
    fn push(&self, item: T) -> bool {
        let _guard = self.producer_lock.lock();
        self.ring.push(item)
    }
}

/// An array of `Ring`s indexed by a hash of the calling thread's identity,
/// with dynamic doubling (up to a configured cap) when contention exceeds a
/// threshold.
///
/// Mirrors spec.md §4.2: `record(e)` selects a stripe by thread-identity hash;
/// a failed `offer` bumps a contention counter, and once that counter crosses
/// `expansion_threshold` the stripe count doubles under a short mutex, which
/// copies the existing stripe references into the new array and initializes
/// only the newly added slots, then atomically publishes the new array.
/// Producers that raced the expansion and still hold the old array keep
/// writing into the very same `Stripe` (its `Arc` stays alive via their
/// handle), so in-flight events are never lost by the expansion itself —
/// only a full ring still drops events, per spec.
pub struct StripedRingBuffer<T> {
    inner: Arc<StripedInner<T>>,
}

struct StripedInner<T> {
    stripes: RwLock<Arc<Vec<Arc<Stripe<T>>>>>,
    expansion_lock: Mutex<()>,
    contention: AtomicUsize,
    max_stripes: usize,
    expansion_threshold: usize,
    ring_config: RingConfig,
    closed: AtomicBool,
    /// Per-stripe consumption count for FIFO verification (debug only).
    #[cfg(debug_assertions)]
    consumed_counts: RwLock<Arc<Vec<AtomicU64>>>,
}

impl<T> StripedRingBuffer<T> {
    /// Creates a new striped ring buffer starting with `initial_stripes`
    /// stripes (rounded up to a power of two), doubling up to `max_stripes`
    /// once contention crosses `expansion_threshold` failed offers.
    pub fn new(
        ring_config: RingConfig,
        initial_stripes: usize,
        max_stripes: usize,
        expansion_threshold: usize,
    ) -> Self {
        let initial_stripes = initial_stripes.max(1).next_power_of_two();
        let max_stripes = max_stripes.max(initial_stripes).next_power_of_two();
        let stripes = Self::new_rings(ring_config, initial_stripes);

        #[cfg(debug_assertions)]
        let consumed_counts = (0..initial_stripes).map(|_| AtomicU64::new(0)).collect();

        Self {
            inner: Arc::new(StripedInner {
                stripes: RwLock::new(Arc::new(stripes)),
                expansion_lock: Mutex::new(()),
                contention: AtomicUsize::new(0),
                max_stripes,
                expansion_threshold,
                ring_config,
                closed: AtomicBool::new(false),
                #[cfg(debug_assertions)]
                consumed_counts: RwLock::new(Arc::new(consumed_counts)),
            }),
        }
    }

    fn new_rings(ring_config: RingConfig, count: usize) -> Vec<Arc<Stripe<T>>> {
        (0..count).map(|_| Arc::new(Stripe::new(ring_config))).collect()
    }

    fn stripe_index(stripe_count: usize) -> usize {
        let mut hasher = AHasher::default();
        std::thread::current().id().hash(&mut hasher);
        (hasher.finish() as usize) & (stripe_count - 1)
    }

    /// Records an access event, selecting a stripe by the current thread's
    /// identity hash. Returns `Err` only if the buffer is closed; a full
    /// stripe is a silent data-loss path (contention is counted and may
    /// trigger expansion), matching spec.md's "Losses... are acceptable" rule.
    pub fn record(&self, item: T) -> Result<(), StripedRingBufferError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(StripedRingBufferError::Closed);
        }

        let stripes = self.inner.stripes.read().clone();
        let idx = Self::stripe_index(stripes.len());

        if stripes[idx].push(item) {
            return Ok(());
        }

        // Offer failed: bump contention and maybe expand.
        let prev = self.inner.contention.fetch_add(1, Ordering::Relaxed);
        if prev + 1 >= self.inner.expansion_threshold {
            self.maybe_expand(stripes.len());
        }

        Ok(())
    }

    /// Doubles the stripe count under a short mutex, unless another thread
    /// already expanded past `observed_len` or the cap has been reached.
    fn maybe_expand(&self, observed_len: usize) {
        if observed_len >= self.inner.max_stripes {
            self.inner.contention.store(0, Ordering::Relaxed);
            return;
        }

        let _guard = self.inner.expansion_lock.lock();

        // Re-check under the lock: another thread may have already expanded.
        let current = self.inner.stripes.read().clone();
        if current.len() != observed_len || current.len() >= self.inner.max_stripes {
            return;
        }

        let new_len = (current.len() * 2).min(self.inner.max_stripes);
        let mut expanded: Vec<Arc<Stripe<T>>> = Vec::with_capacity(new_len);
        expanded.extend(current.iter().cloned());
        while expanded.len() < new_len {
            expanded.push(Arc::new(Stripe::new(self.inner.ring_config)));
        }

        *self.inner.stripes.write() = Arc::new(expanded);

        #[cfg(debug_assertions)]
        {
            let old_counts = self.inner.consumed_counts.read().clone();
            let mut new_counts: Vec<AtomicU64> = Vec::with_capacity(new_len);
            for old in old_counts.iter() {
                new_counts.push(AtomicU64::new(old.load(Ordering::Relaxed)));
            }
            while new_counts.len() < new_len {
                new_counts.push(AtomicU64::new(0));
            }
            *self.inner.consumed_counts.write() = Arc::new(new_counts);
        }

        self.inner.contention.store(0, Ordering::Relaxed);
        tracing::debug!(old_stripes = observed_len, new_stripes = new_len, "striped ring buffer expanded");
    }

    /// Drains every stripe, applying `handler` to each event in FIFO order
    /// within a stripe (interleaved across stripes). Returns total consumed.
    pub fn drain_all<F>(&self, mut handler: F) -> usize
    where
        F: FnMut(&T),
    {
        let stripes = self.inner.stripes.read().clone();
        #[cfg(debug_assertions)]
        let counts = self.inner.consumed_counts.read().clone();
        let mut total = 0;

        for (idx, stripe) in stripes.iter().enumerate() {
            let consumed = stripe.ring.consume_batch(&mut handler);

            #[cfg(debug_assertions)]
            if idx < counts.len() {
                let old = counts[idx].load(Ordering::Relaxed);
                let new = old + consumed as u64;
                debug_assert_fifo_count!(idx, old, new);
                counts[idx].store(new, Ordering::Relaxed);
            }

            total += consumed;
        }

        total
    }

    /// Drains up to `max_total` items across all stripes.
    pub fn drain_up_to<F>(&self, max_total: usize, mut handler: F) -> usize
    where
        F: FnMut(&T),
    {
        let stripes = self.inner.stripes.read().clone();
        let mut total = 0;

        for stripe in stripes.iter() {
            if total >= max_total {
                break;
            }
            total += stripe.ring.consume_up_to(max_total - total, &mut handler);
        }

        total
    }

    /// Returns true iff any stripe currently holds undrained events.
    pub fn needs_draining(&self) -> bool {
        self.inner.stripes.read().iter().any(|s| !s.ring.is_empty())
    }

    /// Current stripe count.
    pub fn stripe_count(&self) -> usize {
        self.inner.stripes.read().len()
    }

    /// Close the buffer; further `record` calls return `Err`.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        for stripe in self.inner.stripes.read().iter() {
            stripe.ring.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl<T> Clone for StripedRingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

unsafe impl<T: Send> Send for StripedRingBuffer<T> {}
unsafe impl<T: Send> Sync for StripedRingBuffer<T> {}

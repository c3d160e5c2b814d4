mod composite;
mod fifo;
mod idle_time;
mod lfu;
mod lru;
mod lru_list;
mod weighted;
mod window_tinylfu;

pub use composite::Composite;
pub use fifo::{Fifo, Order};
pub use idle_time::IdleTime;
pub use lfu::Lfu;
pub use lru::Lru;
pub use weighted::WeightBased;
pub use window_tinylfu::WindowTinyLfu;

use std::time::Duration;

/// Common contract every eviction policy variant implements, per spec.md
/// §4.3: `update`, `remove`, `select_victim`, `clear`.
///
/// The policy owns no entry data — only the bookkeeping needed to pick a
/// victim. It is driven exclusively by the maintenance task after it drains
/// access events off the striped ring buffer, never from a reader thread
/// (spec.md §5: "The eviction policy itself is updated only by the
/// maintenance task").
pub trait EvictionPolicy<K>: Send {
    /// Records an insert or an access for `k`. `is_new` distinguishes a
    /// fresh insert from a hit-driven touch, since several variants (FIFO,
    /// FILO, WeightBased) only reorder on insert. `weight` is the entry's
    /// configured weight (1 for unweighted caches); only `WeightBased` uses
    /// it, but it's part of the common signature so the maintenance task
    /// can drive every variant identically off the same drained event.
    fn update(&mut self, key: K, weight: u32, is_new: bool);

    /// Drops any bookkeeping the policy holds for `key`, if present.
    fn remove(&mut self, key: &K);

    /// Selects and removes the next eviction victim, or `None` if the
    /// policy holds no entries (or, for `IdleTime`, none yet past its
    /// threshold).
    fn select_victim(&mut self) -> Option<K>;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Selects which `EvictionPolicy` variant a `Cache` is built with.
///
/// Carried by value in `CacheConfig`; the cache façade builds the
/// corresponding boxed policy at construction time.
#[derive(Debug, Clone)]
pub enum PolicyKind {
    Lru,
    Lfu,
    Fifo,
    Filo,
    WeightBased { max_weight: u64 },
    IdleTime { threshold: Duration },
    Composite(Vec<PolicyKind>),
    /// The primary variant: Window + Probationary/Protected Main regions
    /// with sketch-based admission (spec.md §4.3).
    WindowTinyLfu,
}

/// Builds the boxed policy object a `PolicyKind` describes.
///
/// `maximum_size` seeds `WindowTinyLfu`'s region sizing and the admission
/// sketch's width; it is ignored by variants that don't need it.
pub(crate) fn build_policy<K>(kind: &PolicyKind, maximum_size: u64) -> Box<dyn EvictionPolicy<K>>
where
    K: std::hash::Hash + Eq + Clone + Send + 'static,
{
    match kind {
        PolicyKind::Lru => Box::new(Lru::new()),
        PolicyKind::Lfu => Box::new(Lfu::new()),
        PolicyKind::Fifo => Box::new(Fifo::new(Order::Fifo)),
        PolicyKind::Filo => Box::new(Fifo::new(Order::Filo)),
        PolicyKind::WeightBased { max_weight } => Box::new(WeightBased::new(*max_weight)),
        PolicyKind::IdleTime { threshold } => Box::new(IdleTime::new(*threshold)),
        PolicyKind::Composite(kinds) => {
            let children = kinds.iter().map(|k| build_policy(k, maximum_size)).collect();
            Box::new(Composite::new(children))
        }
        PolicyKind::WindowTinyLfu => {
            Box::new(WindowTinyLfu::new(maximum_size.max(1)))
        }
    }
}

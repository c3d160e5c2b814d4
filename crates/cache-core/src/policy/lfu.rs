use super::EvictionPolicy;
use std::collections::HashMap;
use std::hash::Hash;

struct Counted<K> {
    key: K,
    count: u64,
    /// Monotonic insertion sequence, used to break count ties in favor of
    /// the entry inserted first (spec.md §4.3: "ties broken by insertion
    /// order").
    sequence: u64,
}

/// LFU: victim is the key with the lowest access count, ties broken by
/// insertion order, per spec.md §4.3.
pub struct Lfu<K> {
    counts: HashMap<K, usize>,
    order: Vec<Counted<K>>,
    next_sequence: u64,
}

impl<K: Hash + Eq + Clone> Lfu<K> {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            order: Vec::new(),
            next_sequence: 0,
        }
    }

    fn sync_order_entry(&mut self, key: &K, count: u64) {
        if let Some(slot) = self.order.iter_mut().find(|c| &c.key == key) {
            slot.count = count;
        }
    }
}

impl<K: Hash + Eq + Clone + Send> EvictionPolicy<K> for Lfu<K> {
    fn update(&mut self, key: K, _weight: u32, is_new: bool) {
        let count = {
            let entry = self.counts.entry(key.clone()).or_insert(0);
            *entry += 1;
            *entry as u64
        };
        if is_new {
            let sequence = self.next_sequence;
            self.next_sequence += 1;
            self.order.push(Counted { key, count, sequence });
        } else {
            self.sync_order_entry(&key, count);
        }
    }

    fn remove(&mut self, key: &K) {
        self.counts.remove(key);
        self.order.retain(|c| &c.key != key);
    }

    fn select_victim(&mut self) -> Option<K> {
        let idx = self
            .order
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| (c.count, c.sequence))
            .map(|(idx, _)| idx)?;
        let victim = self.order.remove(idx);
        self.counts.remove(&victim.key);
        Some(victim.key)
    }

    fn clear(&mut self) {
        self.counts.clear();
        self.order.clear();
        self.next_sequence = 0;
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

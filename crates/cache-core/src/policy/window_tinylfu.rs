use super::lru_list::LruList;
use super::EvictionPolicy;
use crate::sketch::FrequencySketch;
use std::hash::Hash;

/// Window-TinyLFU: the primary eviction policy (spec.md §4.3).
///
/// The store is partitioned conceptually into a small **Window** region
/// (~1% of capacity) and a **Main** region split into **Protected** (80%)
/// and **Probationary** (20%). New keys enter the Window; when it overflows,
/// its LRU tail is compared against Probationary's LRU tail using
/// sketch-estimated access frequency, and only admitted to Main if it's
/// estimated to be accessed more often. A hit inside Main promotes
/// Probationary → Protected.
pub struct WindowTinyLfu<K> {
    sketch: FrequencySketch,
    window: LruList<K>,
    protected: LruList<K>,
    probationary: LruList<K>,
    window_capacity: usize,
    protected_capacity: usize,
    probationary_capacity: usize,
    /// Count of window-overflow admission decisions made so far; while this
    /// is below `warmup_threshold` every candidate is admitted unconditionally
    /// (spec.md §4.3: "If the store is still cold... admit unconditionally").
    admissions: u64,
    warmup_threshold: u64,
    /// A key rejected (or displaced) by the last admission decision, handed
    /// out by the next `select_victim()` call. Window/Main overflow is
    /// resolved synchronously inside `update`, but eviction from the store
    /// itself is the caller's responsibility via `select_victim`.
    pending_victim: Option<K>,
}

impl<K: Hash + Eq + Clone> WindowTinyLfu<K> {
    pub fn new(maximum_size: u64) -> Self {
        let window_capacity = ((maximum_size / 100).max(1)) as usize;
        let main_capacity = (maximum_size.saturating_sub(window_capacity as u64)).max(1) as usize;
        let protected_capacity = ((main_capacity * 80) / 100).max(1);
        let probationary_capacity = main_capacity.saturating_sub(protected_capacity).max(1);

        Self {
            sketch: FrequencySketch::new(maximum_size),
            window: LruList::new(),
            protected: LruList::new(),
            probationary: LruList::new(),
            window_capacity,
            protected_capacity,
            probationary_capacity,
            admissions: 0,
            warmup_threshold: main_capacity as u64,
            pending_victim: None,
        }
    }

    fn overflow_window(&mut self) {
        if self.window.len() <= self.window_capacity {
            return;
        }
        let Some(candidate) = self.window.pop_back() else { return };

        if self.probationary.is_empty() && self.protected.is_empty() {
            self.probationary.push_front(candidate);
            self.admissions += 1;
            return;
        }

        if self.admissions < self.warmup_threshold {
            self.admissions += 1;
            self.probationary.push_front(candidate);
            self.overflow_probationary();
            return;
        }

        match self.probationary.peek_back().cloned() {
            None => {
                self.probationary.push_front(candidate);
            }
            Some(victim) => {
                let candidate_freq = self.sketch.frequency(&candidate);
                let victim_freq = self.sketch.frequency(&victim);
                if candidate_freq > victim_freq {
                    self.probationary.pop_back();
                    self.probationary.push_front(candidate);
                    self.pending_victim = Some(victim);
                } else {
                    self.pending_victim = Some(candidate);
                }
            }
        }
        self.admissions += 1;
        self.overflow_probationary();
    }

    fn overflow_probationary(&mut self) {
        if self.probationary.len() <= self.probationary_capacity {
            return;
        }
        if let Some(overflowed) = self.probationary.pop_back() {
            if self.pending_victim.is_none() {
                self.pending_victim = Some(overflowed);
            } else {
                // Already have a victim from this round; drop the older
                // overflow candidate back in front rather than lose both.
                self.probationary.push_front(overflowed);
            }
        }
    }

    fn overflow_protected(&mut self) {
        if self.protected.len() <= self.protected_capacity {
            return;
        }
        if let Some(demoted) = self.protected.pop_back() {
            self.probationary.push_front(demoted);
            self.overflow_probationary();
        }
    }
}

impl<K: Hash + Eq + Clone + Send> EvictionPolicy<K> for WindowTinyLfu<K> {
    fn update(&mut self, key: K, _weight: u32, is_new: bool) {
        self.sketch.increment(&key);

        if is_new {
            self.window.push_front(key);
            self.overflow_window();
            return;
        }

        if self.window.contains(&key) {
            self.window.move_to_front(&key);
        } else if self.probationary.remove(&key) {
            self.protected.push_front(key);
            self.overflow_protected();
        } else if self.protected.contains(&key) {
            self.protected.move_to_front(&key);
        }
    }

    fn remove(&mut self, key: &K) {
        self.window.remove(key);
        self.probationary.remove(key);
        self.protected.remove(key);
        if self.pending_victim.as_ref() == Some(key) {
            self.pending_victim = None;
        }
    }

    fn select_victim(&mut self) -> Option<K> {
        if let Some(victim) = self.pending_victim.take() {
            return Some(victim);
        }
        if let Some(k) = self.window.peek_back().cloned() {
            self.window.remove(&k);
            return Some(k);
        }
        if let Some(k) = self.probationary.peek_back().cloned() {
            self.probationary.remove(&k);
            return Some(k);
        }
        if let Some(k) = self.protected.peek_back().cloned() {
            self.protected.remove(&k);
            return Some(k);
        }
        None
    }

    fn clear(&mut self) {
        self.window.clear();
        self.protected.clear();
        self.probationary.clear();
        self.admissions = 0;
        self.pending_victim = None;
    }

    fn len(&self) -> usize {
        self.window.len() + self.protected.len() + self.probationary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_keys_enter_window() {
        let mut policy: WindowTinyLfu<i32> = WindowTinyLfu::new(1000);
        policy.update(1, 1, true);
        assert_eq!(policy.len(), 1);
        assert!(policy.window.contains(&1));
    }

    #[test]
    fn test_hot_key_survives_cold_stream_after_warmup() {
        let mut policy: WindowTinyLfu<i32> = WindowTinyLfu::new(200);
        // Fill past warmup so admission starts comparing frequencies.
        for k in 0..400 {
            policy.update(k, 1, true);
        }
        // Make key 0 hot by repeated access (if still present) and boost its
        // sketch frequency directly via repeated inserts under the same key.
        for _ in 0..20 {
            policy.sketch.increment(&999_i32);
        }
        policy.update(999, 1, true);
        for _ in 0..20 {
            policy.update(999, 1, false);
        }
        // A cold one-shot key competing for window->main admission now loses
        // against 999's elevated frequency.
        policy.update(1_000_000, 1, true);
        assert!(policy.sketch.frequency(&999) >= policy.sketch.frequency(&1_000_000));
    }

    #[test]
    fn test_remove_clears_pending_victim() {
        let mut policy: WindowTinyLfu<i32> = WindowTinyLfu::new(10);
        for k in 0..50 {
            policy.update(k, 1, true);
        }
        policy.remove(&0);
        assert!(!policy.window.contains(&0));
    }

    #[test]
    fn test_clear_resets_all_regions() {
        let mut policy: WindowTinyLfu<i32> = WindowTinyLfu::new(100);
        for k in 0..10 {
            policy.update(k, 1, true);
        }
        policy.clear();
        assert_eq!(policy.len(), 0);
        assert_eq!(policy.select_victim(), None);
    }
}

use crate::invariants::debug_assert_counter_range;
use ahash::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Number of independent hash functions (rows) in the sketch.
const HASH_FUNCTIONS: usize = 4;

/// Default multiplier (relative to configured capacity) for the sample-count
/// reset threshold, per spec.md §4.1 ("conventionally 10x").
const DEFAULT_SAMPLE_MULTIPLIER: u64 = 10;

/// Approximate counting structure for recent access frequency.
///
/// A Count-Min-Sketch variant with 4-bit saturating counters packed 16-per-
/// 64-bit atomic word. `increment` bumps `HASH_FUNCTIONS` counters derived
/// from independently-seeded hashes of the key; `frequency` returns the
/// minimum of those counters (the CMS estimate). A sample counter tracks
/// increments; once it crosses the reset threshold, every counter is halved
/// ("aged") and the sample counter resets, keeping the sketch responsive to
/// recent access patterns rather than accumulating unbounded history.
pub struct FrequencySketch {
    /// `table.len()` 64-bit words, each packing sixteen 4-bit counters.
    table: Box<[AtomicU64]>,
    table_mask: u64,
    seeds: [u64; HASH_FUNCTIONS],
    sample_size: u64,
    size: AtomicUsize,
}

impl FrequencySketch {
    /// Creates a sketch sized for `maximum_size` entries (table width is the
    /// next power of two ≥ `maximum_size`), using the default 10x sample
    /// multiplier.
    pub fn new(maximum_size: u64) -> Self {
        Self::with_sample_multiplier(maximum_size, DEFAULT_SAMPLE_MULTIPLIER)
    }

    /// Same as `new`, but with a configurable reset-threshold multiplier —
    /// exposed per spec.md's supplemented-feature note so tests can force
    /// frequent aging without waiting for a realistically-sized workload.
    pub fn with_sample_multiplier(maximum_size: u64, sample_multiplier: u64) -> Self {
        let width = maximum_size.max(8).next_power_of_two();
        // 16 counters per 64-bit word.
        let words = (width / 16).max(1) as usize;
        let table = (0..words).map(|_| AtomicU64::new(0)).collect::<Vec<_>>().into_boxed_slice();

        let hasher = RandomState::new();
        let mut seeds = [0u64; HASH_FUNCTIONS];
        for (i, seed) in seeds.iter_mut().enumerate() {
            // Distinct, deterministic-per-process seeds for each hash row.
            *seed = hasher.hash_one((i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1));
        }

        Self {
            table,
            table_mask: (width - 1) as u64,
            seeds,
            sample_size: width.saturating_mul(sample_multiplier),
            size: AtomicUsize::new(0),
        }
    }

    fn index_and_slot(&self, hash: u64) -> (usize, u32) {
        let idx = (hash & self.table_mask) as usize;
        let word = idx / 16;
        let slot = (idx % 16) as u32 * 4;
        (word, slot)
    }

    fn row_hash(&self, hash: u64, row: usize) -> u64 {
        let mut h = hash ^ self.seeds[row];
        // Finalizing mix (splitmix64) so a single XOR doesn't leave the low
        // bits correlated across rows.
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
        h ^= h >> 33;
        h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
        h ^= h >> 33;
        h
    }

    fn hash_key<K: Hash>(key: &K) -> u64 {
        let mut hasher = ahash::AHasher::default();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// Bumps the counters for `key`, aging the whole table first if the
    /// sample threshold has been crossed.
    pub fn increment<K: Hash>(&self, key: &K) {
        let hash = Self::hash_key(key);
        self.increment_hash(hash);
    }

    fn increment_hash(&self, hash: u64) {
        let mut any_incremented = false;
        for row in 0..HASH_FUNCTIONS {
            let row_hash = self.row_hash(hash, row);
            let (word, slot) = self.index_and_slot(row_hash);
            if self.try_increment_slot(word, slot) {
                any_incremented = true;
            }
        }

        if any_incremented {
            let prev = self.size.fetch_add(1, Ordering::Relaxed);
            if prev as u64 + 1 >= self.sample_size {
                self.age();
            }
        }
    }

    fn try_increment_slot(&self, word: usize, slot: u32) -> bool {
        let mask = 0xFu64 << slot;
        loop {
            let current = self.table[word].load(Ordering::Relaxed);
            let value = (current & mask) >> slot;
            debug_assert_counter_range!(value);
            if value >= 15 {
                return false;
            }
            let new_val = current + (1u64 << slot);
            if self.table[word]
                .compare_exchange_weak(current, new_val, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Returns the minimum counter value across all rows for `key` — the
    /// Count-Min-Sketch frequency estimate, in `[0, 15]`.
    pub fn frequency<K: Hash>(&self, key: &K) -> u8 {
        let hash = Self::hash_key(key);
        self.frequency_hash(hash)
    }

    fn frequency_hash(&self, hash: u64) -> u8 {
        let mut min = 15u8;
        for row in 0..HASH_FUNCTIONS {
            let row_hash = self.row_hash(hash, row);
            let (word, slot) = self.index_and_slot(row_hash);
            let current = self.table[word].load(Ordering::Relaxed);
            let value = ((current >> slot) & 0xF) as u8;
            debug_assert_counter_range!(value as u64);
            min = min.min(value);
        }
        min
    }

    /// Halves every counter in place (floor division), per spec.md §8's
    /// "after age(), every counter is halved".
    pub fn age(&self) {
        for word in self.table.iter() {
            loop {
                let current = word.load(Ordering::Relaxed);
                // Halve each 4-bit nibble independently: mask off the low bit
                // of every nibble, then shift right by one within each nibble.
                let halved = (current >> 1) & 0x7777_7777_7777_7777;
                if word
                    .compare_exchange_weak(current, halved, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    break;
                }
            }
        }
        self.size.store(0, Ordering::Relaxed);
    }

    /// Number of increments observed since the last aging pass.
    pub fn sample_size(&self) -> u64 {
        self.size.load(Ordering::Relaxed) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_increments() {
        let sketch = FrequencySketch::new(64);
        assert_eq!(sketch.frequency(&"a"), 0);
        sketch.increment(&"a");
        assert_eq!(sketch.frequency(&"a"), 1);
        sketch.increment(&"a");
        sketch.increment(&"a");
        assert_eq!(sketch.frequency(&"a"), 3);
    }

    #[test]
    fn test_frequency_saturates_at_15() {
        let sketch = FrequencySketch::new(64);
        for _ in 0..100 {
            sketch.increment(&"a");
        }
        assert_eq!(sketch.frequency(&"a"), 15);
    }

    #[test]
    fn test_aging_halves_counters() {
        let sketch = FrequencySketch::new(64);
        for _ in 0..8 {
            sketch.increment(&"a");
        }
        assert_eq!(sketch.frequency(&"a"), 8);
        sketch.age();
        assert_eq!(sketch.frequency(&"a"), 4);
    }

    #[test]
    fn test_automatic_aging_on_sample_threshold() {
        let sketch = FrequencySketch::new(8);
        // table width = 8, sample_size = 80; drive past it with distinct keys.
        for i in 0..200u64 {
            sketch.increment(&i);
        }
        // After crossing the threshold at least once, the sample counter must
        // have reset rather than growing unbounded.
        assert!(sketch.sample_size() < 200);
    }

    #[test]
    fn test_distinct_keys_rarely_identical_frequency_after_one_hit() {
        let sketch = FrequencySketch::new(1024);
        sketch.increment(&"x");
        assert!(sketch.frequency(&"x") >= 1);
        assert_eq!(sketch.frequency(&"never-inserted"), 0);
    }
}

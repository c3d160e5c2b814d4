use super::EvictionPolicy;
use std::collections::HashMap;
use std::hash::Hash;

/// WeightBased: victim selection prefers the largest-weight entry, since a
/// single large eviction is more likely to restore `total_weight ≤
/// max_weight` than several small ones, per spec.md §4.3.
pub struct WeightBased<K> {
    max_weight: u64,
    weights: HashMap<K, u32>,
}

impl<K: Hash + Eq + Clone> WeightBased<K> {
    pub fn new(max_weight: u64) -> Self {
        Self { max_weight, weights: HashMap::new() }
    }

    pub fn total_weight(&self) -> u64 {
        self.weights.values().map(|w| *w as u64).sum()
    }

    pub fn max_weight(&self) -> u64 {
        self.max_weight
    }
}

impl<K: Hash + Eq + Clone + Send> EvictionPolicy<K> for WeightBased<K> {
    fn update(&mut self, key: K, weight: u32, _is_new: bool) {
        self.weights.insert(key, weight);
    }

    fn remove(&mut self, key: &K) {
        self.weights.remove(key);
    }

    fn select_victim(&mut self) -> Option<K> {
        let victim = self
            .weights
            .iter()
            .max_by_key(|(_, w)| **w)
            .map(|(k, _)| k.clone())?;
        self.weights.remove(&victim);
        Some(victim)
    }

    fn clear(&mut self) {
        self.weights.clear();
    }

    fn len(&self) -> usize {
        self.weights.len()
    }
}

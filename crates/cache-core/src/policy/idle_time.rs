use super::EvictionPolicy;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// IdleTime: victim is an entry whose idle duration exceeds a configured
/// threshold; if none qualifies, eviction is deferred (returns `None`),
/// per spec.md §4.3.
pub struct IdleTime<K> {
    threshold: Duration,
    last_touched: HashMap<K, Instant>,
}

impl<K: Hash + Eq + Clone> IdleTime<K> {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold, last_touched: HashMap::new() }
    }
}

impl<K: Hash + Eq + Clone + Send> EvictionPolicy<K> for IdleTime<K> {
    fn update(&mut self, key: K, _weight: u32, _is_new: bool) {
        self.last_touched.insert(key, Instant::now());
    }

    fn remove(&mut self, key: &K) {
        self.last_touched.remove(key);
    }

    fn select_victim(&mut self) -> Option<K> {
        let now = Instant::now();
        let victim = self
            .last_touched
            .iter()
            .max_by_key(|(_, t)| now.saturating_duration_since(**t))
            .filter(|(_, t)| now.saturating_duration_since(**t) > self.threshold)
            .map(|(k, _)| k.clone())?;
        self.last_touched.remove(&victim);
        Some(victim)
    }

    fn clear(&mut self) {
        self.last_touched.clear();
    }

    fn len(&self) -> usize {
        self.last_touched.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_defers_when_nothing_past_threshold() {
        let mut policy: IdleTime<i32> = IdleTime::new(Duration::from_secs(60));
        policy.update(1, 1, true);
        assert_eq!(policy.select_victim(), None);
    }

    #[test]
    fn test_selects_entry_past_threshold() {
        let mut policy: IdleTime<i32> = IdleTime::new(Duration::from_millis(5));
        policy.update(1, 1, true);
        sleep(Duration::from_millis(20));
        assert_eq!(policy.select_victim(), Some(1));
    }
}

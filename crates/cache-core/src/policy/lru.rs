use super::lru_list::LruList;
use super::EvictionPolicy;
use std::hash::Hash;

/// LRU: move-to-front on every update (insert or access); victim is the
/// tail (least-recently-used), per spec.md §4.3.
pub struct Lru<K> {
    order: LruList<K>,
}

impl<K: Hash + Eq + Clone> Lru<K> {
    pub fn new() -> Self {
        Self { order: LruList::new() }
    }
}

impl<K: Hash + Eq + Clone + Send> EvictionPolicy<K> for Lru<K> {
    fn update(&mut self, key: K, _weight: u32, _is_new: bool) {
        self.order.push_front(key);
    }

    fn remove(&mut self, key: &K) {
        self.order.remove(key);
    }

    fn select_victim(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    fn clear(&mut self) {
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_victim_is_least_recently_used() {
        let mut lru: Lru<i32> = Lru::new();
        lru.update(1, 1, true);
        lru.update(2, 1, true);
        lru.update(3, 1, true);
        assert_eq!(lru.select_victim(), Some(1));
    }

    #[test]
    fn test_access_moves_to_front() {
        let mut lru: Lru<i32> = Lru::new();
        lru.update(1, 1, true);
        lru.update(2, 1, true);
        lru.update(3, 1, true);
        lru.update(1, 1, false); // touch 1 again
        assert_eq!(lru.select_victim(), Some(2));
    }

    #[test]
    fn test_remove_drops_from_consideration() {
        let mut lru: Lru<i32> = Lru::new();
        lru.update(1, 1, true);
        lru.update(2, 1, true);
        lru.remove(&1);
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.select_victim(), Some(2));
    }
}

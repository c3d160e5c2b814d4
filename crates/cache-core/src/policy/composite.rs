use super::EvictionPolicy;

/// Composite: an ordered list of child policies; the first one that
/// returns a victim wins, per spec.md §4.3. Every child still observes
/// every `update`/`remove`/`clear` so its own bookkeeping stays consistent
/// regardless of which child ultimately supplies victims.
pub struct Composite<K> {
    children: Vec<Box<dyn EvictionPolicy<K>>>,
}

impl<K> Composite<K> {
    pub fn new(children: Vec<Box<dyn EvictionPolicy<K>>>) -> Self {
        Self { children }
    }
}

impl<K: Clone + Send> EvictionPolicy<K> for Composite<K> {
    fn update(&mut self, key: K, weight: u32, is_new: bool) {
        for child in &mut self.children {
            child.update(key.clone(), weight, is_new);
        }
    }

    fn remove(&mut self, key: &K) {
        for child in &mut self.children {
            child.remove(key);
        }
    }

    fn select_victim(&mut self) -> Option<K> {
        for child in &mut self.children {
            if let Some(victim) = child.select_victim() {
                for other in &mut self.children {
                    other.remove(&victim);
                }
                return Some(victim);
            }
        }
        None
    }

    fn clear(&mut self) {
        for child in &mut self.children {
            child.clear();
        }
    }

    fn len(&self) -> usize {
        self.children.iter().map(|c| c.len()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fifo::{Fifo, Order};
    use super::super::lru::Lru;
    use super::*;

    #[test]
    fn test_first_policy_with_a_victim_wins() {
        let children: Vec<Box<dyn EvictionPolicy<i32>>> =
            vec![Box::new(Fifo::new(Order::Fifo)), Box::new(Lru::new())];
        let mut composite = Composite::new(children);
        composite.update(1, 1, true);
        composite.update(2, 1, true);
        assert_eq!(composite.select_victim(), Some(1));
    }
}

use std::fmt::Debug;
use std::hash::Hash;

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<K> = rustc_hash::FxHashSet<K>;

pub fn map_new<K, V>() -> HashMap<K, V> {
    rustc_hash::FxHashMap::default()
}

pub fn map_with_capacity<K, V>(capacity: usize) -> HashMap<K, V> {
    rustc_hash::FxHashMap::with_capacity_and_hasher(capacity, Default::default())
}

pub fn set_new<K>() -> HashSet<K> {
    rustc_hash::FxHashSet::default()
}

/// A table over composite keys that only knows the keys it was seeded with.
///
/// There is no implicit default: reading or updating a key that was never
/// seeded is a defect in the caller and panics.
#[derive(Debug, Clone)]
pub struct SeededTable<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash + Copy + Debug, V> SeededTable<K, V> {
    pub fn new() -> Self {
        Self {
            entries: map_new(),
        }
    }

    /// Seeds `key` with `value`, unless it is already present.
    pub fn seed(&mut self, key: K, value: V) {
        self.entries.entry(key).or_insert(value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &K) -> &V {
        self.entries
            .get(key)
            .unwrap_or_else(|| panic!("Key {:?} was never seeded", key))
    }

    pub fn get_mut(&mut self, key: &K) -> &mut V {
        self.entries
            .get_mut(key)
            .unwrap_or_else(|| panic!("Key {:?} was never seeded", key))
    }

    pub fn try_get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::SeededTable;

    #[test]
    fn seeded_keys_are_updatable() {
        let mut table: SeededTable<(u32, u32), f64> = SeededTable::new();
        table.seed((1, 2), 0.0);
        *table.get_mut(&(1, 2)) += 3.5;
        table.seed((1, 2), 100.0);
        assert_eq!(*table.get(&(1, 2)), 3.5);
        assert!(table.try_get(&(2, 1)).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    #[should_panic(expected = "never seeded")]
    fn unseeded_read_panics() {
        let table: SeededTable<(u32, u32), f64> = SeededTable::new();
        table.get(&(0, 0));
    }
}

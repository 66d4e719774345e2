use crate::col::{map_new, HashMap};
use std::hash::Hash;

/// Hands out dense indices for external identifiers in order of first appearance.
pub struct Indexer<Id, Index, F>
where
    Id: Eq + Hash,
    Index: Eq + Copy,
    F: Fn(usize) -> Index,
{
    ids: Vec<Id>,
    index_by_id: HashMap<Id, Index>,
    to_index: F,
}

impl<Id: Eq + Hash + Clone, Index: Eq + Copy, F: Fn(usize) -> Index> Indexer<Id, Index, F> {
    pub fn new(to_index: F) -> Self {
        Self {
            ids: Vec::new(),
            index_by_id: map_new(),
            to_index,
        }
    }

    /// Returns the index of `id`, assigning the next free one if `id` is new.
    pub fn index(&mut self, id: Id) -> Index {
        if let Some(&index) = self.index_by_id.get(&id) {
            return index;
        }
        let index = (self.to_index)(self.ids.len());
        self.ids.push(id.clone());
        self.index_by_id.insert(id, index);
        index
    }

    pub fn get(&self, id: &Id) -> Option<Index> {
        self.index_by_id.get(id).copied()
    }

    /// The external identifier that was assigned the `position`-th index.
    pub fn id(&self, position: usize) -> &Id {
        &self.ids[position]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Indexer;

    #[test]
    fn indices_are_dense_and_stable() {
        let mut indexer = Indexer::new(|i| i as u32 * 10);
        assert_eq!(indexer.index("b"), 0);
        assert_eq!(indexer.index("a"), 10);
        assert_eq!(indexer.index("b"), 0);
        assert_eq!(indexer.get(&"a"), Some(10));
        assert_eq!(indexer.get(&"c"), None);
        assert_eq!(*indexer.id(1), "a");
        assert_eq!(indexer.len(), 2);
    }
}

//! Reorder buffer restoring row-major order of tiles finished out of order.

use std::collections::BTreeMap;

/// Holds items until every item with a lower index has been released.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next: u64,
    pending: BTreeMap<u64, T>,
}

impl<T> ReorderBuffer<T> {
    pub fn new() -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Accept the item at `index` and release every item now in sequence.
    ///
    /// Items at an index already released are dropped.
    pub fn push(&mut self, index: u64, item: T) -> Vec<(u64, T)> {
        if index < self.next {
            return Vec::new();
        }
        self.pending.insert(index, item);

        let mut ready = Vec::new();
        while let Some(item) = self.pending.remove(&self.next) {
            ready.push((self.next, item));
            self.next += 1;
        }
        ready
    }

    /// Index of the next item to be released.
    pub fn next_expected(&self) -> u64 {
        self.next
    }

    /// Number of items waiting for a predecessor.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

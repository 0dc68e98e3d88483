//! Boat id pool.

use std::collections::BTreeSet;

use crate::game::state::SourceId;

/// Hands out boat ids from a fixed pool, lowest first.
///
/// An id is never handed out twice while it is held; releasing it makes it
/// available again.
#[derive(Clone, Debug, Default)]
pub struct SourceIdAllocator {
    free: BTreeSet<SourceId>,
    held: BTreeSet<SourceId>,
}

impl SourceIdAllocator {
    /// Create a pool from the given ids. Duplicates collapse.
    pub fn new(ids: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            free: ids.into_iter().collect(),
            held: BTreeSet::new(),
        }
    }

    /// Take the lowest free id, or `None` when the pool is exhausted.
    pub fn allocate(&mut self) -> Option<SourceId> {
        let id = self.free.pop_first()?;
        self.held.insert(id);
        Some(id)
    }

    /// Return a held id to the pool. Returns false if it was not held.
    pub fn release(&mut self, id: SourceId) -> bool {
        if self.held.remove(&id) {
            self.free.insert(id);
            true
        } else {
            false
        }
    }

    /// Whether `id` is currently handed out.
    pub fn is_held(&self, id: SourceId) -> bool {
        self.held.contains(&id)
    }

    /// Ids still available.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

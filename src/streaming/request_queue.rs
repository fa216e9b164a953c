//! Deduplicating, insertion-ordered request queue.

use std::collections::HashSet;
use std::hash::Hash;

/// Ordered set of pending requests. Membership, not a counter, decides
/// whether an entry is queued: pushing a queued entry again is a no-op.
#[derive(Clone, Debug)]
pub struct RequestQueue<T> {
    order: Vec<T>,
    members: HashSet<T>,
}

impl<T: Copy + Eq + Hash> RequestQueue<T> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            members: HashSet::new(),
        }
    }

    /// Append `item` unless already queued. Returns whether it was added.
    pub fn push(&mut self, item: T) -> bool {
        if !self.members.insert(item) {
            return false;
        }
        self.order.push(item);
        true
    }

    /// Remove `item` if queued. Returns whether it was present.
    pub fn remove(&mut self, item: T) -> bool {
        if !self.members.remove(&item) {
            return false;
        }
        self.order.retain(|queued| *queued != item);
        true
    }

    pub fn contains(&self, item: T) -> bool {
        self.members.contains(&item)
    }

    /// Copy of the current contents in queue order.
    pub fn snapshot(&self) -> Vec<T> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop everything; returns how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.order.len();
        self.order.clear();
        self.members.clear();
        count
    }
}

impl<T: Copy + Eq + Hash> Default for RequestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

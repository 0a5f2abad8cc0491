//! Bounded memory of recently handled message ids.
//!
//! The feed re-delivers recent pages on every poll, so the loop remembers
//! which ids it has already dispatched.  Once the cache reaches its
//! capacity the oldest `evict` ids are dropped in one go, keeping the most
//! recent ones resident.

use std::collections::{HashSet, VecDeque};

use crate::channel::MessageId;

/// Default number of resident ids that triggers eviction.
pub const DEFAULT_CAPACITY: usize = 200;

/// Default number of oldest ids dropped per eviction.
pub const DEFAULT_EVICT: usize = 100;

/// Insertion-ordered set of message ids with batch eviction.
#[derive(Debug, Clone)]
pub struct DedupCache {
    order: VecDeque<MessageId>,
    seen: HashSet<MessageId>,
    capacity: usize,
    evict: usize,
}

impl DedupCache {
    /// Create a cache that evicts `evict` ids whenever it holds `capacity`.
    ///
    /// `capacity` is raised to at least 1 and `evict` is clamped into
    /// `1..=capacity`.
    pub fn new(capacity: usize, evict: usize) -> Self {
        let capacity = capacity.max(1);
        let evict = evict.clamp(1, capacity);
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
            evict,
        }
    }

    /// Record `id`.  Returns `false` if it was already resident.
    pub fn insert(&mut self, id: MessageId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);

        if self.order.len() >= self.capacity {
            for old in self.order.drain(..self.evict) {
                self.seen.remove(&old);
            }
            tracing::trace!(resident = self.order.len(), "dedup cache evicted oldest ids");
        }
        true
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Resident ids, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.order.iter().copied()
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_EVICT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_resident_ids() {
        let mut cache = DedupCache::default();
        assert!(cache.insert(7));
        assert!(!cache.insert(7));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(7));
    }

    #[test]
    fn eviction_keeps_most_recent_half() {
        let mut cache = DedupCache::default();
        for id in 1..=200 {
            assert!(cache.insert(id));
        }
        assert_eq!(cache.len(), 100);

        assert!(cache.insert(201));
        assert_eq!(cache.len(), 101);

        let resident: Vec<_> = cache.iter().collect();
        let expected: Vec<_> = (101..=201).collect();
        assert_eq!(resident, expected);

        // Evicted ids are forgotten and would be dispatched again.
        assert!(!cache.contains(100));
        assert!(cache.insert(1));
    }

    #[test]
    fn parameters_are_clamped() {
        let mut cache = DedupCache::new(0, 0);
        assert!(cache.insert(1));
        assert!(cache.is_empty());

        let mut cache = DedupCache::new(4, 10);
        for id in 0..4 {
            cache.insert(id);
        }
        assert!(cache.is_empty());
    }
}

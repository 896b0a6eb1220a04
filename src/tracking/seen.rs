//! # Fixed-capacity, insertion-ordered set of run numbers.
//!
//! [`BoundedSeenSet`] remembers which runs are fully finalized so later
//! duplicate or stale snapshots can be ignored with an O(1) lookup.
//!
//! ## Rules
//! - Inserting a present run is a no-op (its position is not refreshed).
//! - When full, inserting a new run evicts the **oldest inserted** run (FIFO).
//! - Nothing is removed except by eviction.
//!
//! ## Precondition
//! Eviction order follows insertion order, not run-number order. With runs
//! arriving in roughly increasing order the two coincide; if they diverge,
//! an old finalized run may be forgotten while an older one is retained.

use std::collections::{HashSet, VecDeque};

use crate::error::ConfigError;
use crate::run::RunNumber;

/// Default number of finalized runs remembered.
pub const DEFAULT_SEEN_CAPACITY: usize = 1000;

/// Bounded FIFO set of run numbers.
#[derive(Clone, Debug)]
pub struct BoundedSeenSet {
    capacity: usize,
    order: VecDeque<RunNumber>,
    members: HashSet<RunNumber>,
}

impl BoundedSeenSet {
    /// Creates an empty set holding at most `capacity` runs.
    ///
    /// # Errors
    /// [`ConfigError::InvalidCapacity`] if `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { capacity });
        }
        Ok(Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        })
    }

    /// Inserts `run`; returns `false` if it was already present.
    ///
    /// Evicts the oldest entry when the set is full.
    pub fn insert(&mut self, run: RunNumber) -> bool {
        if !self.members.insert(run) {
            return false;
        }
        self.order.push_back(run);

        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
                tracing::trace!(run = evicted, "seen set evicted oldest run");
            }
        }
        true
    }

    #[inline]
    pub fn contains(&self, run: RunNumber) -> bool {
        self.members.contains(&run)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Runs in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = RunNumber> + '_ {
        self.order.iter().copied()
    }
}

impl Default for BoundedSeenSet {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SEEN_CAPACITY,
            order: VecDeque::new(),
            members: HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        let err = BoundedSeenSet::new(0).unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_capacity");
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = BoundedSeenSet::new(4).unwrap();
        assert!(set.insert(10));
        assert!(!set.insert(10));
        assert!(set.contains(10));
        assert!(!set.contains(11));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_evicts_oldest_insertion() {
        let mut set = BoundedSeenSet::new(3).unwrap();
        for run in [5, 1, 9] {
            set.insert(run);
        }
        set.insert(2);

        assert!(!set.contains(5), "first inserted run should be evicted");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 9, 2]);
    }

    #[test]
    fn test_duplicate_insert_does_not_refresh_position() {
        let mut set = BoundedSeenSet::new(2).unwrap();
        set.insert(1);
        set.insert(2);
        set.insert(1);
        set.insert(3);

        assert!(!set.contains(1));
        assert!(set.contains(2));
        assert!(set.contains(3));
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut set = BoundedSeenSet::new(16).unwrap();
        for run in 0..10_000 {
            set.insert(run);
            assert!(set.len() <= set.capacity());
        }
        assert_eq!(set.len(), 16);
        assert!(set.contains(9_999));
        assert!(!set.contains(9_983));
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(BoundedSeenSet::default().capacity(), DEFAULT_SEEN_CAPACITY);
    }
}

//! Grow-only Counter (G-Counter).
//!
//! Each replica counts its own increments in one slot of a version vector.
//! The value is the sum of all slots; merge takes the per-replica maximum.

use crate::crdt::Convergent;
use crate::error::CrdtResult;
use crate::version_vector::VersionVector;
use concord_types::ReplicaId;
use serde::{Deserialize, Serialize};

/// A grow-only counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GCounter {
    counts: VersionVector,
}

impl GCounter {
    /// Creates a new counter with value 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter from per-replica increment counts.
    #[must_use]
    pub fn from_counts(counts: VersionVector) -> Self {
        Self { counts }
    }

    /// Records one increment by `replica`.
    ///
    /// Fails with [`CrdtError::ClockOverflow`](crate::CrdtError::ClockOverflow)
    /// if that replica's count is saturated.
    pub fn increment(&mut self, replica: ReplicaId) -> CrdtResult<()> {
        self.counts.increment(replica).map(|_| ())
    }

    /// Returns the current value: the sum of every replica's increments.
    #[must_use]
    pub fn value(&self) -> u64 {
        u64::try_from(self.counts.total()).unwrap_or(u64::MAX)
    }

    /// Returns the per-replica increment counts.
    #[must_use]
    pub fn counts(&self) -> &VersionVector {
        &self.counts
    }
}

impl Convergent for GCounter {
    fn merge(&mut self, other: &Self) {
        self.counts.sync(&other.counts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica(n: u8) -> ReplicaId {
        ReplicaId::from_uuid(uuid::Uuid::from_bytes([
            n, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]))
    }

    #[test]
    fn new_counter_is_zero() {
        assert_eq!(GCounter::new().value(), 0);
    }

    #[test]
    fn increment_increases_value() {
        let mut c = GCounter::new();
        c.increment(replica(1)).unwrap();
        c.increment(replica(1)).unwrap();
        c.increment(replica(2)).unwrap();
        assert_eq!(c.value(), 3);
        assert_eq!(c.counts().get(&replica(1)), 2);
    }

    #[test]
    fn merge_takes_max_per_replica() {
        let mut a = GCounter::new();
        a.increment(replica(1)).unwrap();
        a.increment(replica(1)).unwrap();

        let mut b = GCounter::new();
        b.increment(replica(1)).unwrap();
        b.increment(replica(2)).unwrap();

        let merged = a.merged(&b);
        assert_eq!(merged.value(), 3);
        assert_eq!(merged, b.merged(&a));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = GCounter::new();
        a.increment(replica(1)).unwrap();
        assert_eq!(a.merged(&a), a);
    }

    #[test]
    fn from_counts_sums_every_slot() {
        let counts: VersionVector = [(replica(1), 4), (replica(2), 6)].into_iter().collect();
        assert_eq!(GCounter::from_counts(counts).value(), 10);
    }
}

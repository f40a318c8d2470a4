//! Positive-Negative Counter CRDT.
//!
//! A PN-Counter supports both increment and decrement operations across
//! distributed replicas. It keeps two version vectors (positive and negative)
//! keyed by replica ID. The value is `sum(positive) - sum(negative)`.
//!
//! Satisfies commutativity, associativity, and idempotency for merge.

use crate::crdt::Convergent;
use crate::error::CrdtResult;
use crate::version_vector::VersionVector;
use concord_types::ReplicaId;
use serde::{Deserialize, Serialize};

/// A Positive-Negative Counter CRDT.
///
/// Each replica tracks its own increments and decrements independently.
/// The counter value is the difference between all increments and all decrements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PNCounter {
    positive: VersionVector,
    negative: VersionVector,
}

impl PNCounter {
    /// Creates a new counter with value 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one increment by `replica`.
    pub fn increment(&mut self, replica: ReplicaId) -> CrdtResult<()> {
        self.positive.increment(replica).map(|_| ())
    }

    /// Records one decrement by `replica`.
    pub fn decrement(&mut self, replica: ReplicaId) -> CrdtResult<()> {
        self.negative.increment(replica).map(|_| ())
    }

    /// Returns the current counter value (may be negative).
    #[must_use]
    pub fn value(&self) -> i64 {
        let pos = i128::try_from(self.positive.total()).unwrap_or(i128::MAX);
        let neg = i128::try_from(self.negative.total()).unwrap_or(i128::MAX);
        let diff = pos.saturating_sub(neg);
        i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
    }

    /// Returns the per-replica increments.
    #[must_use]
    pub fn positive(&self) -> &VersionVector {
        &self.positive
    }

    /// Returns the per-replica decrements.
    #[must_use]
    pub fn negative(&self) -> &VersionVector {
        &self.negative
    }
}

impl Convergent for PNCounter {
    /// Takes the per-replica max of each vector.
    fn merge(&mut self, other: &Self) {
        self.positive.sync(&other.positive);
        self.negative.sync(&other.negative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version_vector::CausalOrder;

    fn replica(n: u8) -> ReplicaId {
        ReplicaId::from_uuid(uuid::Uuid::from_bytes([
            n, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]))
    }

    /// Applies `ups` increments and `downs` decrements on behalf of `n`.
    fn counter(n: u8, ups: u32, downs: u32) -> PNCounter {
        let mut c = PNCounter::new();
        for _ in 0..ups {
            c.increment(replica(n)).unwrap();
        }
        for _ in 0..downs {
            c.decrement(replica(n)).unwrap();
        }
        c
    }

    #[test]
    fn starts_at_zero() {
        assert_eq!(PNCounter::new().value(), 0);
        assert!(PNCounter::new().positive().is_empty());
    }

    #[test]
    fn value_is_increments_minus_decrements() {
        assert_eq!(counter(1, 10, 3).value(), 7);
        assert_eq!(counter(1, 0, 5).value(), -5);
    }

    #[test]
    fn halves_are_tracked_per_replica() {
        let c = counter(1, 4, 2);
        assert_eq!(c.positive().get(&replica(1)), 4);
        assert_eq!(c.negative().get(&replica(1)), 2);
        assert_eq!(c.negative().get(&replica(2)), 0);
    }

    #[test]
    fn merge_sums_across_replicas() {
        let mut a = counter(1, 3, 0);
        a.merge(&counter(2, 7, 1));
        assert_eq!(a.value(), 9);
    }

    #[test]
    fn merge_keeps_highest_count_per_replica() {
        // Both states saw replica 1, one of them further along
        let ahead = counter(1, 5, 4);
        let behind = counter(1, 3, 1);
        let merged = ahead.merged(&behind);
        assert_eq!(merged, ahead);
        assert_eq!(merged.value(), 1);
    }

    #[test]
    fn three_replicas_converge_after_full_exchange() {
        let states = [counter(1, 10, 0), counter(2, 20, 5), counter(3, 0, 3)];
        let merged: Vec<PNCounter> = states
            .iter()
            .map(|s| states.iter().fold(s.clone(), |acc, other| acc.merged(other)))
            .collect();

        assert!(merged.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(merged[0].value(), 22);
        assert_eq!(
            merged[0].positive().compare(states[1].positive()),
            CausalOrder::After
        );
    }

    #[test]
    fn equal_values_do_not_imply_equal_states() {
        let a = counter(1, 5, 0);
        let b = counter(2, 5, 0);
        assert_eq!(a.value(), b.value());
        assert_ne!(a, b);
    }

    #[test]
    fn serde_roundtrip_keeps_both_halves() {
        let mut c = counter(1, 10, 3);
        c.merge(&counter(2, 5, 0));

        let json = serde_json::to_string(&c).unwrap();
        let parsed: PNCounter = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);
        assert_eq!(parsed.value(), 12);
    }
}

//! Capability traits shared by clocks and CRDT states.
//!
//! Instead of a class hierarchy, replicated types are composed from three
//! small capabilities:
//! - [`Clock`]: something that counts events and can be compared causally
//! - [`Convergent`]: a state that merges with another full state (CvRDT)
//! - [`Commutative`]: a state that applies operations (CmRDT)

use crate::error::CrdtResult;
use crate::version_vector::CausalOrder;

/// A logical clock: incrementable, syncable and causally comparable.
pub trait Clock: Clone {
    /// Records one local event. Fails, leaving the clock unchanged, on overflow.
    fn increment(&mut self) -> CrdtResult<()>;

    /// Advances this clock to include everything `other` has seen.
    fn sync(&mut self, other: &Self);

    /// Returns the causal relation of `self` to `other`.
    fn compare(&self, other: &Self) -> CausalOrder;

    /// Returns what this clock would read after one more local event.
    fn successor(&self) -> CrdtResult<Self> {
        let mut next = self.clone();
        next.increment()?;
        Ok(next)
    }
}

/// A state-based CRDT.
///
/// `merge` must be commutative, associative and idempotent, so replicas that
/// exchange full states in any order, any number of times, converge.
pub trait Convergent: Clone {
    /// Merges another replica's state into this one.
    fn merge(&mut self, other: &Self);

    /// Returns the merge of this state and another.
    #[must_use]
    fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }
}

/// An operation-based CRDT.
///
/// Operations are delivered exactly once and in per-origin order by the
/// replication layer, so `apply` needs no deduplication of its own.
pub trait Commutative {
    /// The operation broadcast to other replicas.
    type Operation;

    /// Checks an operation about to be issued locally.
    ///
    /// Runs before any state or clock is touched, so a rejected operation
    /// leaves the replica unchanged. Remote operations are never re-checked.
    fn prepare(&self, _operation: &Self::Operation) -> CrdtResult<()> {
        Ok(())
    }

    /// Applies the effect of an operation.
    fn apply(&mut self, operation: &Self::Operation);
}

//! Counter replica operations.

use crate::convergent::ConvergentReplica;
use crate::error::ReplicationResult;
use crate::updatable::Updatable;
use concord_crdt as crdt;

impl ConvergentReplica<crdt::GCounter> {
    /// Adds one on behalf of this replica.
    pub fn increment(&self) -> ReplicationResult<()> {
        let id = self.id();
        self.mutate(|counter| counter.increment(id))
    }

    /// Returns the sum of every replica's increments.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.read(crdt::GCounter::value)
    }
}

impl ConvergentReplica<crdt::PNCounter> {
    /// Adds one on behalf of this replica.
    pub fn increment(&self) -> ReplicationResult<()> {
        let id = self.id();
        self.mutate(|counter| counter.increment(id))
    }

    /// Subtracts one on behalf of this replica.
    pub fn decrement(&self) -> ReplicationResult<()> {
        let id = self.id();
        self.mutate(|counter| counter.decrement(id))
    }

    /// Returns increments minus decrements across all replicas.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.read(crdt::PNCounter::value)
    }
}

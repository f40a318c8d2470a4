//! Last-writer-wins register replica operations.

use crate::convergent::ConvergentReplica;
use crate::error::ReplicationResult;
use crate::updatable::Updatable;
use concord_crdt as crdt;
use concord_types::{ReplicaId, UtcTimestamp};
use std::fmt;

impl<T> ConvergentReplica<crdt::LWWRegister<T>>
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Writes a new value on behalf of this replica.
    ///
    /// The write is stamped strictly later than the winning write this
    /// replica has seen.
    ///
    /// # Blocking
    ///
    /// A write in the same millisecond as the current winner blocks the
    /// calling thread until the wall clock advances. The replica lock is not
    /// held while waiting.
    pub fn assign(&self, value: T) -> ReplicationResult<()> {
        let id = self.id();
        let timestamp = UtcTimestamp::after(self.timestamp());
        self.mutate(|register| register.assign_at(value, id, timestamp))
    }

    /// Returns the winning value, if any write has been seen.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.read(|register| register.value().cloned())
    }

    /// Returns the wall-clock time of the winning write.
    #[must_use]
    pub fn timestamp(&self) -> UtcTimestamp {
        self.read(crdt::LWWRegister::timestamp)
    }

    /// Returns the replica that made the winning write.
    #[must_use]
    pub fn writer(&self) -> Option<ReplicaId> {
        self.read(crdt::LWWRegister::writer)
    }
}

//! Last-Writer-Wins Register (LWW-Register).
//!
//! A CRDT that stores a single value. Writes are ordered by, in turn:
//! 1. causal order of the writers' version vectors (a write that saw
//!    another always wins over it)
//! 2. UTC wall-clock timestamp, for concurrent writes
//! 3. the lowest writer id, when timestamps collide
//!
//! Use cases:
//! - Single-value properties (a title, a status, a configuration value)
//! - Any field where "last write wins" semantics are acceptable

use crate::crdt::Convergent;
use crate::error::CrdtResult;
use crate::version_vector::{CausalOrder, VersionVector};
use concord_types::{ReplicaId, UtcTimestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A Last-Writer-Wins Register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LWWRegister<T> {
    /// The current value; `None` until the first write.
    value: Option<T>,
    /// Wall-clock time of the winning write.
    timestamp: UtcTimestamp,
    /// Replica that performed the winning write.
    writer: Option<ReplicaId>,
    /// Every write this register has seen, per replica.
    version: VersionVector,
}

impl<T> Default for LWWRegister<T> {
    fn default() -> Self {
        Self {
            value: None,
            timestamp: UtcTimestamp::EPOCH,
            writer: None,
            version: VersionVector::new(),
        }
    }
}

impl<T> LWWRegister<T> {
    /// Creates an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a register with explicit write metadata (for testing or replay).
    #[must_use]
    pub fn with_timestamp(
        value: T,
        timestamp: UtcTimestamp,
        writer: ReplicaId,
        version: VersionVector,
    ) -> Self {
        Self {
            value: Some(value),
            timestamp,
            writer: Some(writer),
            version,
        }
    }

    /// Returns a reference to the current value.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Returns the timestamp of the winning write.
    #[must_use]
    pub fn timestamp(&self) -> UtcTimestamp {
        self.timestamp
    }

    /// Returns the replica that performed the winning write.
    #[must_use]
    pub fn writer(&self) -> Option<ReplicaId> {
        self.writer
    }

    /// Returns the register's version vector.
    #[must_use]
    pub fn version(&self) -> &VersionVector {
        &self.version
    }

    /// Writes a new value on behalf of `writer`.
    ///
    /// The write causally follows everything this register has seen, and its
    /// timestamp is strictly later than the current winner's, whoever wrote it.
    ///
    /// # Blocking
    ///
    /// If the winning write carries the current millisecond, this sleeps until
    /// the wall clock advances. Callers holding a lock should take the
    /// timestamp first and use [`assign_at`](Self::assign_at).
    pub fn assign(&mut self, value: T, writer: ReplicaId) -> CrdtResult<()> {
        let timestamp = UtcTimestamp::after(self.timestamp);
        self.assign_at(value, writer, timestamp)
    }

    /// Writes a new value stamped with `timestamp`.
    ///
    /// A timestamp not later than the current winner's is raised to one
    /// millisecond past it, so a causally later write never loses on time.
    pub fn assign_at(
        &mut self,
        value: T,
        writer: ReplicaId,
        timestamp: UtcTimestamp,
    ) -> CrdtResult<()> {
        let version = self.version.successor(writer)?;
        self.value = Some(value);
        self.timestamp = timestamp.max(self.timestamp.next_millis());
        self.writer = Some(writer);
        self.version = version;
        Ok(())
    }

    /// Determines if `other`'s write should win over the current value.
    fn should_update(&self, other: &Self) -> bool {
        match self.version.compare(&other.version) {
            CausalOrder::Before => true,
            CausalOrder::After | CausalOrder::Equal => false,
            CausalOrder::Concurrent => match other.timestamp.cmp(&self.timestamp) {
                Ordering::Greater => true,
                Ordering::Less => false,
                // Tie-breaker: the lowest writer id wins
                Ordering::Equal => other.writer < self.writer,
            },
        }
    }
}

impl<T: Clone> Convergent for LWWRegister<T> {
    /// The winning write is kept; versions are always synced.
    fn merge(&mut self, other: &Self) {
        if self.should_update(other) {
            self.value = other.value.clone();
            self.timestamp = other.timestamp;
            self.writer = other.writer;
        }
        self.version.sync(&other.version);
    }
}

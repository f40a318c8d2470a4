//! Update messages exchanged between replicas.
//!
//! Two envelope kinds cover both replication disciplines:
//! 1. [`OperationMessage`]: one operation stamped with its origin's [`Dot`]
//!    (operation-based, delivered in per-origin order)
//! 2. [`SnapshotMessage`]: a full state copy plus the version it reflects
//!    (state-based, any order)
//!
//! Envelopes are immutable once created and serialize to JSON for transports
//! that carry them across process boundaries.

use crate::error::ReplicationResult;
use concord_crdt::{Dot, VersionVector};
use concord_types::ReplicaId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A message that mutates an [`Updatable`](crate::Updatable).
pub trait UpdateMessage: Clone + fmt::Debug + Send + Sync + 'static {
    /// Identity used by exchanges to reject republishing the same message.
    type Key: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Returns the replica that created the message.
    fn origin(&self) -> ReplicaId;

    /// Returns the message identity.
    fn key(&self) -> Self::Key;

    /// Returns how far along its origin's history the message is.
    ///
    /// Channels order their inbox by rank.
    fn rank(&self) -> u64;

    /// Serializes the message to JSON.
    fn to_json(&self) -> ReplicationResult<String>
    where
        Self: Serialize,
    {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a message from JSON.
    fn from_json(json: &str) -> ReplicationResult<Self>
    where
        Self: DeserializeOwned,
    {
        Ok(serde_json::from_str(json)?)
    }
}

/// A message that carries its sender's version at creation time.
pub trait VersionedUpdateMessage: UpdateMessage {
    /// Returns the sender's version when the message was created.
    fn version(&self) -> VersionVector;
}

/// An operation broadcast by an operation-based replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMessage<Op> {
    /// The origin's event that produced this operation.
    dot: Dot,
    /// The operation itself.
    operation: Op,
}

impl<Op> OperationMessage<Op> {
    /// Creates a message for the event `dot`.
    pub fn new(dot: Dot, operation: Op) -> Self {
        Self { dot, operation }
    }

    /// Returns the event that produced this operation.
    #[must_use]
    pub fn dot(&self) -> Dot {
        self.dot
    }

    /// Returns the operation.
    #[must_use]
    pub fn operation(&self) -> &Op {
        &self.operation
    }
}

impl<Op> UpdateMessage for OperationMessage<Op>
where
    Op: Clone + fmt::Debug + Send + Sync + 'static,
{
    type Key = Dot;

    fn origin(&self) -> ReplicaId {
        *self.dot.id()
    }

    fn key(&self) -> Dot {
        self.dot
    }

    fn rank(&self) -> u64 {
        self.dot.version().value()
    }
}

impl<Op> VersionedUpdateMessage for OperationMessage<Op>
where
    Op: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// The dotted vector holding only the origin's event.
    fn version(&self) -> VersionVector {
        self.dot.to_vector()
    }
}

/// A full state copy broadcast by a state-based replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMessage<S> {
    origin: ReplicaId,
    version: VersionVector,
    state: S,
}

impl<S> SnapshotMessage<S> {
    /// Creates a snapshot of `state` as of `version`.
    pub fn new(origin: ReplicaId, version: VersionVector, state: S) -> Self {
        Self {
            origin,
            version,
            state,
        }
    }

    /// Returns the version the snapshot reflects.
    #[must_use]
    pub fn version(&self) -> &VersionVector {
        &self.version
    }

    /// Returns the state copy.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Consumes the message, returning the state copy.
    #[must_use]
    pub fn into_state(self) -> S {
        self.state
    }
}

impl<S> UpdateMessage for SnapshotMessage<S>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
{
    type Key = (ReplicaId, VersionVector);

    fn origin(&self) -> ReplicaId {
        self.origin
    }

    fn key(&self) -> Self::Key {
        (self.origin, self.version.clone())
    }

    fn rank(&self) -> u64 {
        u64::try_from(self.version.total()).unwrap_or(u64::MAX)
    }
}

impl<S> VersionedUpdateMessage for SnapshotMessage<S>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn version(&self) -> VersionVector {
        self.version.clone()
    }
}

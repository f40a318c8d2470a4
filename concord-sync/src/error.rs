//! Error types for the replication layer.

use concord_crdt::CrdtError;
use concord_types::ReplicaId;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors that can occur while replicating CRDTs.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// An operation arrived before one of its causal predecessors.
    #[error("out-of-order update from {origin}: expected event {expected}, received {received}")]
    OutOfOrder {
        origin: ReplicaId,
        expected: u64,
        received: u64,
    },

    /// The channel is already bound to a replica.
    #[error("channel is already registered")]
    AlreadyRegistered,

    /// The replica is bound to a different channel.
    #[error("replica belongs to a different channel")]
    ForeignChannel,

    /// Another replica with the same id is attached to the exchange.
    #[error("replica {0} is already attached to this exchange")]
    DuplicateReplica(ReplicaId),

    /// The channel has no replica yet.
    #[error("channel is not registered")]
    NotRegistered,

    /// The channel or exchange has been closed.
    #[error("channel closed")]
    ChannelClosed,

    /// A message with the same identity is still awaiting delivery.
    #[error("message {0} was already published")]
    DuplicateMessage(String),

    /// The replica behind a channel has been dropped.
    #[error("replica has been dropped")]
    ReplicaDropped,

    /// A clock or CRDT operation failed.
    #[error(transparent)]
    Crdt(#[from] CrdtError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReplicationError {
    /// Returns true for conditions the delivery loops absorb and retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::OutOfOrder { .. } | Self::ReplicaDropped)
    }
}

//! The two ends of the replication protocol.
//!
//! An [`Updatable`] is a replica: something identified by a [`ReplicaId`]
//! that changes state when handed an update message. A [`DeliveryEndpoint`]
//! is what an exchange sees of a replica: an id and an inbox.

use crate::channel::DeliveryChannel;
use crate::error::ReplicationResult;
use crate::protocol::UpdateMessage;
use concord_types::ReplicaId;

/// A replica that can be mutated by update messages.
pub trait Updatable: Send + Sync + 'static {
    /// The message kind this replica consumes and produces.
    type Message: UpdateMessage;

    /// Returns the replica's id.
    fn id(&self) -> ReplicaId;

    /// Applies a message received from another replica.
    ///
    /// Returning a transient error (see
    /// [`ReplicationError::is_transient`](crate::ReplicationError::is_transient))
    /// asks the channel to retry the message later.
    fn update(&self, message: &Self::Message) -> ReplicationResult<()>;

    /// Returns the channel this replica is bound to.
    fn channel(&self) -> &DeliveryChannel<Self::Message>;
}

/// A destination an exchange fans messages out to.
pub trait DeliveryEndpoint<M: UpdateMessage>: Send + Sync {
    /// Returns the id of the replica behind this endpoint.
    fn id(&self) -> ReplicaId;

    /// Accepts a message for later application.
    ///
    /// An error leaves the message pending at the exchange, which retries
    /// on its next cycle.
    fn receive(&self, message: M) -> ReplicationResult<()>;
}

//! Operation-based (CmRDT) replication.
//!
//! Each local operation is stamped with the replica's next [`Dot`] and
//! broadcast on its own. Receivers apply an operation only when it is the
//! direct successor of what they have seen from its origin:
//!
//! 1. the local vector precedes the operation's dot: apply, then sync
//! 2. the dot is already covered by the local vector: duplicate, ignore
//! 3. otherwise a predecessor is missing: reject as out of order, and the
//!    channel retries once the gap is filled
//!
//! This gives exactly-once application on top of at-least-once delivery, so
//! [`Commutative::apply`] implementations never deduplicate.
//!
//! [`Dot`]: concord_crdt::Dot

use crate::channel::{DeliveryChannel, InboxOrder};
use crate::error::{ReplicationError, ReplicationResult};
use crate::exchange::DeliveryExchange;
use crate::protocol::{OperationMessage, UpdateMessage, VersionedUpdateMessage};
use crate::updatable::Updatable;
use crate::util::lock;
use concord_crdt::{Commutative, LocalVersionVector, VersionVector};
use concord_types::ReplicaId;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Bounds shared by every state replicated through operations.
pub trait OperationState:
    Commutative<Operation: Clone + fmt::Debug + Send + Sync + 'static> + Clone + Send + 'static
{
}

impl<S> OperationState for S where
    S: Commutative<Operation: Clone + fmt::Debug + Send + Sync + 'static> + Clone + Send + 'static
{
}

struct Replica<S> {
    state: S,
    version: LocalVersionVector,
}

/// A replica of an operation-based CRDT.
pub struct CommutativeReplica<S: OperationState> {
    id: ReplicaId,
    inner: Mutex<Replica<S>>,
    channel: DeliveryChannel<OperationMessage<S::Operation>>,
}

impl<S: OperationState> CommutativeReplica<S> {
    /// Creates an empty replica with a freshly minted id.
    pub fn new<E>(exchange: Arc<E>) -> ReplicationResult<Arc<Self>>
    where
        E: DeliveryExchange<OperationMessage<S::Operation>> + 'static,
        S: Default,
    {
        Self::with_state(exchange, None, VersionVector::new(), S::default())
    }

    /// Creates a replica from existing state.
    ///
    /// `version` must describe exactly the operations already folded into
    /// `state`. With `id` set to `None`, the exchange mints one.
    pub fn with_state<E>(
        exchange: Arc<E>,
        id: Option<ReplicaId>,
        version: VersionVector,
        state: S,
    ) -> ReplicationResult<Arc<Self>>
    where
        E: DeliveryExchange<OperationMessage<S::Operation>> + 'static,
    {
        let channel = DeliveryChannel::new(exchange, InboxOrder::OldestFirst);
        let id = channel.resolve_id(id);
        let replica = Arc::new(Self {
            id,
            inner: Mutex::new(Replica {
                state,
                version: LocalVersionVector::with_vector(id, version),
            }),
            channel,
        });
        replica.channel.register(&replica)?;
        Ok(replica)
    }

    /// Applies a local operation and broadcasts it.
    ///
    /// The operation is checked with [`Commutative::prepare`] first; a
    /// rejected operation changes nothing and is not sent.
    pub fn submit(&self, operation: S::Operation) -> ReplicationResult<()> {
        self.channel.ensure_open()?;
        let message = {
            let mut inner = lock(&self.inner);
            inner.state.prepare(&operation)?;
            let dot = inner.version.increment()?;
            inner.state.apply(&operation);
            OperationMessage::new(dot, operation)
        };
        self.channel.publish(message)
    }

    /// Returns a copy of the replica's version vector.
    #[must_use]
    pub fn version(&self) -> VersionVector {
        lock(&self.inner).version.vector().clone()
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> S {
        lock(&self.inner).state.clone()
    }

    /// Reads the current state without copying it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&lock(&self.inner).state)
    }

    /// Closes the replica's channel, draining queued traffic first.
    pub async fn close(&self) -> ReplicationResult<()> {
        self.channel.close().await
    }
}

impl<S: OperationState> Updatable for CommutativeReplica<S> {
    type Message = OperationMessage<S::Operation>;

    fn id(&self) -> ReplicaId {
        self.id
    }

    fn update(&self, message: &Self::Message) -> ReplicationResult<()> {
        let event = message.version();
        let mut inner = lock(&self.inner);

        if inner.version.vector().precedes(&event) {
            inner.state.apply(message.operation());
            inner.version.sync(&event);
            return Ok(());
        }

        if inner.version.vector().dominates(&event) {
            debug!("Ignoring duplicate {} at {}", message.dot(), self.id);
            return Ok(());
        }

        let origin = message.origin();
        Err(ReplicationError::OutOfOrder {
            origin,
            expected: inner.version.vector().get(&origin).saturating_add(1),
            received: message.rank(),
        })
    }

    fn channel(&self) -> &DeliveryChannel<Self::Message> {
        &self.channel
    }
}

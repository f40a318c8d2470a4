//! State-based (CvRDT) replication.
//!
//! Every local mutation advances the replica's own version entry and
//! broadcasts a full snapshot. Receivers merge any snapshot that is not
//! already covered by their version; no delivery order is required because
//! merges are commutative, associative and idempotent.

use crate::channel::{DeliveryChannel, InboxOrder};
use crate::error::ReplicationResult;
use crate::exchange::DeliveryExchange;
use crate::protocol::SnapshotMessage;
use crate::updatable::Updatable;
use crate::util::lock;
use concord_crdt::{CausalOrder, Clock, Convergent, CrdtResult, LocalVersionVector, VersionVector};
use concord_types::ReplicaId;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Bounds shared by every state replicated through snapshots.
pub trait SnapshotState: Convergent + fmt::Debug + Send + Sync + 'static {}

impl<S> SnapshotState for S where S: Convergent + fmt::Debug + Send + Sync + 'static {}

struct Replica<S> {
    state: S,
    version: LocalVersionVector,
}

/// A replica of a state-based CRDT.
pub struct ConvergentReplica<S: SnapshotState> {
    id: ReplicaId,
    inner: Mutex<Replica<S>>,
    channel: DeliveryChannel<SnapshotMessage<S>>,
}

impl<S: SnapshotState> ConvergentReplica<S> {
    /// Creates an empty replica with a freshly minted id.
    pub fn new<E>(exchange: Arc<E>) -> ReplicationResult<Arc<Self>>
    where
        E: DeliveryExchange<SnapshotMessage<S>> + 'static,
        S: Default,
    {
        Self::with_state(exchange, None, VersionVector::new(), S::default())
    }

    /// Creates a replica from existing state.
    ///
    /// With `id` set to `None`, the exchange mints one.
    pub fn with_state<E>(
        exchange: Arc<E>,
        id: Option<ReplicaId>,
        version: VersionVector,
        state: S,
    ) -> ReplicationResult<Arc<Self>>
    where
        E: DeliveryExchange<SnapshotMessage<S>> + 'static,
    {
        let channel = DeliveryChannel::new(exchange, InboxOrder::NewestFirst);
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

    /// Mutates the state locally and broadcasts the result.
    ///
    /// The version successor is computed before `f` runs, so a clock overflow
    /// leaves the state untouched. `f` itself must be all-or-nothing.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut S) -> CrdtResult<R>) -> ReplicationResult<R> {
        self.channel.ensure_open()?;
        let (result, snapshot) = {
            let mut inner = lock(&self.inner);
            let version = inner.version.successor()?;
            let result = f(&mut inner.state)?;
            inner.version = version;
            (result, Self::snapshot_of(self.id, &inner))
        };
        self.channel.publish(snapshot)?;
        Ok(result)
    }

    /// Returns a deep copy of the current state and version.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotMessage<S> {
        Self::snapshot_of(self.id, &lock(&self.inner))
    }

    fn snapshot_of(id: ReplicaId, inner: &Replica<S>) -> SnapshotMessage<S> {
        SnapshotMessage::new(id, inner.version.vector().clone(), inner.state.clone())
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

impl<S: SnapshotState> Updatable for ConvergentReplica<S> {
    type Message = SnapshotMessage<S>;

    fn id(&self) -> ReplicaId {
        self.id
    }

    /// Merges a snapshot unless this replica has already seen its version.
    fn update(&self, snapshot: &Self::Message) -> ReplicationResult<()> {
        let mut inner = lock(&self.inner);
        match inner.version.vector().compare(snapshot.version()) {
            CausalOrder::After | CausalOrder::Equal => {}
            CausalOrder::Before | CausalOrder::Concurrent => {
                inner.state.merge(snapshot.state());
                inner.version.sync(snapshot.version());
            }
        }
        Ok(())
    }

    fn channel(&self) -> &DeliveryChannel<Self::Message> {
        &self.channel
    }
}

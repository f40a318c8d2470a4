//! Fan-out hubs shared by all replicas of one logical data type.
//!
//! A [`DeliveryExchange`] guarantees at-least-once delivery: every message is
//! handed to each endpoint attached at publish time (except its origin), and
//! a destination that fails is retried on the next cycle without holding up
//! the others.
//!
//! [`LocalDeliveryExchange`] is the in-process implementation. Network
//! transports implement the same trait.

use crate::config::ReplicationConfig;
use crate::error::{ReplicationError, ReplicationResult};
use crate::protocol::UpdateMessage;
use crate::updatable::DeliveryEndpoint;
use crate::util::{lock, wait_until};
use async_trait::async_trait;
use concord_types::{IdentifierFactory, ReplicaId, UuidIdentifierFactory};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A hub that fans update messages out to attached endpoints.
#[async_trait]
pub trait DeliveryExchange<M: UpdateMessage>: Send + Sync {
    /// Returns the configuration channels on this exchange inherit.
    fn config(&self) -> &ReplicationConfig;

    /// Returns the factory that mints ids for replicas created without one.
    fn identifiers(&self) -> &dyn IdentifierFactory<ReplicaId>;

    /// Attaches an endpoint. Fails if its id is already attached.
    fn attach(&self, endpoint: Arc<dyn DeliveryEndpoint<M>>) -> ReplicationResult<()>;

    /// Detaches an endpoint and drops it from every pending fan-out.
    fn detach(&self, id: ReplicaId);

    /// Reserves a message for delivery and returns without waiting for it.
    ///
    /// Fails with [`ReplicationError::DuplicateMessage`] while a message with
    /// the same key is still pending.
    fn publish(&self, message: M) -> ReplicationResult<()>;

    /// Returns true while any message from `origin` awaits delivery.
    fn has_pending_deliveries(&self, origin: ReplicaId) -> bool;

    /// Waits until every message from `origin` has been delivered.
    async fn wait_for_deliveries(&self, origin: ReplicaId);

    /// Stops accepting messages, drains what is pending, then stops.
    async fn shutdown(&self);
}

/// A message awaiting acknowledgment from some destinations.
struct Pending<M> {
    message: M,
    remaining: BTreeSet<ReplicaId>,
}

struct ExchangeState<M: UpdateMessage> {
    endpoints: BTreeMap<ReplicaId, Arc<dyn DeliveryEndpoint<M>>>,
    /// Pending messages by publish sequence, so fan-out preserves publish order.
    pending: BTreeMap<u64, Pending<M>>,
    /// Keys of pending messages.
    keys: HashSet<M::Key>,
    next_seq: u64,
    closed: bool,
}

impl<M: UpdateMessage> ExchangeState<M> {
    /// Drops messages every destination has acknowledged.
    fn release_completed(&mut self) {
        let keys = &mut self.keys;
        self.pending.retain(|_, pending| {
            let keep = !pending.remaining.is_empty();
            if !keep {
                keys.remove(&pending.message.key());
            }
            keep
        });
    }
}

/// An in-process exchange driven by a periodic Tokio task.
pub struct LocalDeliveryExchange<M: UpdateMessage> {
    config: ReplicationConfig,
    identifiers: Box<dyn IdentifierFactory<ReplicaId>>,
    state: Mutex<ExchangeState<M>>,
    /// Fired after every delivery cycle and every detach.
    delivered: Notify,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<M: UpdateMessage> LocalDeliveryExchange<M> {
    /// Creates an exchange that mints UUID replica ids.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: ReplicationConfig) -> Arc<Self> {
        Self::with_identifiers(config, UuidIdentifierFactory)
    }

    /// Creates an exchange with a custom id factory.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_identifiers(
        config: ReplicationConfig,
        identifiers: impl IdentifierFactory<ReplicaId> + 'static,
    ) -> Arc<Self> {
        let exchange = Arc::new(Self {
            config,
            identifiers: Box::new(identifiers),
            state: Mutex::new(ExchangeState {
                endpoints: BTreeMap::new(),
                pending: BTreeMap::new(),
                keys: HashSet::new(),
                next_seq: 0,
                closed: false,
            }),
            delivered: Notify::new(),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        });
        let handle = Self::spawn_delivery_loop(&exchange);
        *lock(&exchange.task) = Some(handle);
        exchange
    }

    /// Returns the number of attached endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.state).endpoints.len()
    }

    /// Returns true if no endpoint is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of messages not yet delivered everywhere.
    #[must_use]
    pub fn pending_messages(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// The loop holds only a weak reference, so dropping the last handle to
    /// the exchange ends it.
    fn spawn_delivery_loop(exchange: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(exchange);
        let cancel = exchange.cancel.clone();
        let period = exchange.config.delivery_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(exchange) = weak.upgrade() else {
                    break;
                };
                exchange.deliver_pending();
            }
            debug!("Delivery loop stopped");
        })
    }

    /// Runs one fan-out cycle.
    ///
    /// Endpoints are called outside the state lock; acknowledgments are
    /// recorded and completed messages released in a single critical section.
    fn deliver_pending(&self) {
        let work: Vec<(u64, M, Vec<Arc<dyn DeliveryEndpoint<M>>>)> = {
            let state = lock(&self.state);
            state
                .pending
                .iter()
                .map(|(seq, pending)| {
                    let destinations = pending
                        .remaining
                        .iter()
                        .filter_map(|id| state.endpoints.get(id).cloned())
                        .collect();
                    (*seq, pending.message.clone(), destinations)
                })
                .collect()
        };

        let mut acks = Vec::new();
        for (seq, message, destinations) in work {
            for endpoint in destinations {
                match endpoint.receive(message.clone()) {
                    Ok(()) => acks.push((seq, endpoint.id())),
                    Err(e) => warn!(
                        "Failed to deliver {:?} to {}, retrying next cycle: {}",
                        message.key(),
                        endpoint.id(),
                        e
                    ),
                }
            }
        }

        if !acks.is_empty() {
            let mut state = lock(&self.state);
            for (seq, id) in acks {
                if let Some(pending) = state.pending.get_mut(&seq) {
                    pending.remaining.remove(&id);
                }
            }
            state.release_completed();
        }
        self.delivered.notify_waiters();
    }
}

#[async_trait]
impl<M: UpdateMessage> DeliveryExchange<M> for LocalDeliveryExchange<M> {
    fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    fn identifiers(&self) -> &dyn IdentifierFactory<ReplicaId> {
        self.identifiers.as_ref()
    }

    fn attach(&self, endpoint: Arc<dyn DeliveryEndpoint<M>>) -> ReplicationResult<()> {
        let id = endpoint.id();
        let mut state = lock(&self.state);
        if state.closed {
            return Err(ReplicationError::ChannelClosed);
        }
        if state.endpoints.contains_key(&id) {
            return Err(ReplicationError::DuplicateReplica(id));
        }
        state.endpoints.insert(id, endpoint);
        debug!("Attached replica {} ({} total)", id, state.endpoints.len());
        Ok(())
    }

    fn detach(&self, id: ReplicaId) {
        {
            let mut state = lock(&self.state);
            if state.endpoints.remove(&id).is_none() {
                return;
            }
            for pending in state.pending.values_mut() {
                pending.remaining.remove(&id);
            }
            state.release_completed();
        }
        debug!("Detached replica {}", id);
        self.delivered.notify_waiters();
    }

    fn publish(&self, message: M) -> ReplicationResult<()> {
        let key = message.key();
        let origin = message.origin();
        let mut state = lock(&self.state);
        if state.closed {
            return Err(ReplicationError::ChannelClosed);
        }
        if state.keys.contains(&key) {
            return Err(ReplicationError::DuplicateMessage(format!("{key:?}")));
        }

        let remaining: BTreeSet<ReplicaId> = state
            .endpoints
            .keys()
            .filter(|id| **id != origin)
            .copied()
            .collect();
        if remaining.is_empty() {
            debug!("No destinations for {:?} from {}", key, origin);
            return Ok(());
        }

        debug!(
            "Published {:?} from {} to {} destination(s)",
            key,
            origin,
            remaining.len()
        );
        let seq = state.next_seq;
        state.next_seq += 1;
        state.keys.insert(key);
        state.pending.insert(seq, Pending { message, remaining });
        Ok(())
    }

    fn has_pending_deliveries(&self, origin: ReplicaId) -> bool {
        lock(&self.state)
            .pending
            .values()
            .any(|pending| pending.message.origin() == origin)
    }

    async fn wait_for_deliveries(&self, origin: ReplicaId) {
        wait_until(&self.delivered, || !self.has_pending_deliveries(origin)).await;
    }

    async fn shutdown(&self) {
        {
            let mut state = lock(&self.state);
            if state.closed {
                return;
            }
            state.closed = true;
        }

        let drained = tokio::time::timeout(
            self.config.drain_timeout,
            wait_until(&self.delivered, || lock(&self.state).pending.is_empty()),
        )
        .await;
        if drained.is_err() {
            warn!(
                "Exchange shut down with {} undelivered message(s)",
                self.pending_messages()
            );
        }

        self.cancel.cancel();
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Delivery loop ended abnormally: {}", e);
            }
        }
        info!("Exchange shut down");
    }
}

impl<M: UpdateMessage> Drop for LocalDeliveryExchange<M> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

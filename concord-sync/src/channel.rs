//! Per-replica delivery channels.
//!
//! A [`DeliveryChannel`] binds exactly one [`Updatable`] to one
//! [`DeliveryExchange`]. It moves through three phases, each entered once:
//!
//! ```text
//! unregistered --register--> open --close--> closed
//! ```
//!
//! While open, outbound messages go to the exchange and inbound messages
//! queue in an inbox that a periodic task applies to the replica. Inbox order
//! depends on the replication discipline: operation-based replicas apply the
//! oldest event first, state-based replicas the newest snapshot first so that
//! older snapshots become no-ops.

use crate::error::{ReplicationError, ReplicationResult};
use crate::exchange::DeliveryExchange;
use crate::protocol::UpdateMessage;
use crate::updatable::{DeliveryEndpoint, Updatable};
use crate::util::{lock, wait_until};
use concord_types::ReplicaId;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The order in which a channel applies queued messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxOrder {
    /// Lowest rank first (operation-based replicas).
    OldestFirst,
    /// Highest rank first (state-based replicas).
    NewestFirst,
}

impl InboxOrder {
    fn priority(self, rank: u64) -> i128 {
        match self {
            Self::OldestFirst => -i128::from(rank),
            Self::NewestFirst => i128::from(rank),
        }
    }
}

/// A queued inbound message. Ties in priority fall back to arrival order.
struct Queued<M> {
    priority: i128,
    seq: u64,
    message: M,
}

impl<M> Queued<M> {
    fn order_key(&self) -> (i128, Reverse<u64>) {
        (self.priority, Reverse(self.seq))
    }
}

impl<M> PartialEq for Queued<M> {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl<M> Eq for Queued<M> {}

impl<M> PartialOrd for Queued<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for Queued<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

struct Inbox<M> {
    queue: BinaryHeap<Queued<M>>,
    next_seq: u64,
    /// Messages taken out of the queue and not yet applied or requeued.
    applying: usize,
}

/// The part of a registered channel the exchange and the apply task share.
struct ChannelEndpoint<M: UpdateMessage> {
    id: ReplicaId,
    order: InboxOrder,
    updatable: Weak<dyn Updatable<Message = M>>,
    inbox: Mutex<Inbox<M>>,
    open: AtomicBool,
    /// Fired after every apply cycle.
    applied: Notify,
}

impl<M: UpdateMessage> ChannelEndpoint<M> {
    fn is_open(&self) -> bool {
        self.open.load(AtomicOrdering::SeqCst)
    }

    fn has_pending_updates(&self) -> bool {
        let inbox = lock(&self.inbox);
        !inbox.queue.is_empty() || inbox.applying > 0
    }

    fn enqueue(&self, message: M) {
        let mut inbox = lock(&self.inbox);
        let seq = inbox.next_seq;
        inbox.next_seq += 1;
        inbox.queue.push(Queued {
            priority: self.order.priority(message.rank()),
            seq,
            message,
        });
    }

    /// Applies queued messages to the replica, returning how many succeeded.
    ///
    /// Failed messages are requeued. Passes repeat while they make progress,
    /// so a message held back for a missing predecessor is applied in the
    /// same cycle once that predecessor lands.
    fn apply_pending(&self) -> usize {
        let Some(updatable) = self.updatable.upgrade() else {
            self.applied.notify_waiters();
            return 0;
        };

        let mut applied = 0;
        loop {
            let batch = {
                let mut inbox = lock(&self.inbox);
                let batch = std::mem::take(&mut inbox.queue).into_sorted_vec();
                inbox.applying += batch.len();
                batch
            };
            if batch.is_empty() {
                break;
            }

            let taken = batch.len();
            let mut failed = Vec::new();
            for queued in batch.into_iter().rev() {
                match updatable.update(&queued.message) {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        if e.is_transient() {
                            debug!("Holding {:?} at {}: {}", queued.message.key(), self.id, e);
                        } else {
                            warn!(
                                "Failed to apply {:?} at {}, retrying: {}",
                                queued.message.key(),
                                self.id,
                                e
                            );
                        }
                        failed.push(queued);
                    }
                }
            }

            let progressed = failed.len() < taken;
            let retry = !failed.is_empty();
            {
                let mut inbox = lock(&self.inbox);
                inbox.queue.extend(failed);
                inbox.applying -= taken;
            }
            if !(progressed && retry) {
                break;
            }
        }

        self.applied.notify_waiters();
        applied
    }
}

impl<M: UpdateMessage> DeliveryEndpoint<M> for ChannelEndpoint<M> {
    fn id(&self) -> ReplicaId {
        self.id
    }

    fn receive(&self, message: M) -> ReplicationResult<()> {
        if !self.is_open() {
            return Err(ReplicationError::ChannelClosed);
        }
        self.enqueue(message);
        Ok(())
    }
}

/// A replica's connection to an exchange.
pub struct DeliveryChannel<M: UpdateMessage> {
    exchange: Arc<dyn DeliveryExchange<M>>,
    order: InboxOrder,
    endpoint: Mutex<Option<Arc<ChannelEndpoint<M>>>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<M: UpdateMessage> DeliveryChannel<M> {
    /// Creates an unregistered channel on `exchange`.
    pub fn new(exchange: Arc<dyn DeliveryExchange<M>>, order: InboxOrder) -> Self {
        Self {
            exchange,
            order,
            endpoint: Mutex::new(None),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Returns `requested`, or a fresh id from the exchange's factory.
    #[must_use]
    pub fn resolve_id(&self, requested: Option<ReplicaId>) -> ReplicaId {
        requested.unwrap_or_else(|| self.exchange.identifiers().create())
    }

    /// Binds this channel to `updatable` and opens it.
    ///
    /// `updatable` must expose this very channel. On error nothing changes.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn register<U>(&self, updatable: &Arc<U>) -> ReplicationResult<()>
    where
        U: Updatable<Message = M>,
    {
        let mut slot = lock(&self.endpoint);
        if slot.is_some() {
            return Err(ReplicationError::AlreadyRegistered);
        }
        if !std::ptr::eq(updatable.channel(), self) {
            return Err(ReplicationError::ForeignChannel);
        }

        let id = updatable.id();
        let weak: Weak<dyn Updatable<Message = M>> = Arc::<U>::downgrade(updatable);
        let endpoint = Arc::new(ChannelEndpoint {
            id,
            order: self.order,
            updatable: weak,
            inbox: Mutex::new(Inbox {
                queue: BinaryHeap::new(),
                next_seq: 0,
                applying: 0,
            }),
            open: AtomicBool::new(true),
            applied: Notify::new(),
        });
        self.exchange.attach(endpoint.clone())?;

        let period = self.exchange.config().apply_interval;
        *lock(&self.task) = Some(spawn_apply_loop(
            Arc::clone(&endpoint),
            period,
            self.cancel.clone(),
        ));
        *slot = Some(endpoint);
        info!("Registered replica {}", id);
        Ok(())
    }

    fn endpoint(&self) -> ReplicationResult<Arc<ChannelEndpoint<M>>> {
        lock(&self.endpoint)
            .clone()
            .ok_or(ReplicationError::NotRegistered)
    }

    /// Returns the bound replica's id, if registered.
    #[must_use]
    pub fn id(&self) -> Option<ReplicaId> {
        lock(&self.endpoint).as_ref().map(|endpoint| endpoint.id)
    }

    /// Returns true between `register` and `close`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        lock(&self.endpoint)
            .as_ref()
            .is_some_and(|endpoint| endpoint.is_open())
    }

    /// Fails unless the channel is open.
    pub fn ensure_open(&self) -> ReplicationResult<()> {
        if self.endpoint()?.is_open() {
            Ok(())
        } else {
            Err(ReplicationError::ChannelClosed)
        }
    }

    /// Hands a message to the exchange for delivery to every other replica.
    pub fn publish(&self, message: M) -> ReplicationResult<()> {
        self.ensure_open()?;
        self.exchange.publish(message)
    }

    /// Queues a message from another replica.
    pub fn receive(&self, message: M) -> ReplicationResult<()> {
        self.endpoint()?.receive(message)
    }

    /// Returns true while messages this replica published await delivery.
    #[must_use]
    pub fn has_pending_deliveries(&self) -> bool {
        self.id()
            .is_some_and(|id| self.exchange.has_pending_deliveries(id))
    }

    /// Returns true while received messages await application.
    #[must_use]
    pub fn has_pending_updates(&self) -> bool {
        lock(&self.endpoint)
            .as_ref()
            .is_some_and(|endpoint| endpoint.has_pending_updates())
    }

    /// Waits until every message this replica published has been delivered.
    pub async fn wait_for_deliveries(&self) {
        if let Some(id) = self.id() {
            self.exchange.wait_for_deliveries(id).await;
        }
    }

    /// Waits until every received message has been applied.
    pub async fn wait_for_updates(&self) {
        let Ok(endpoint) = self.endpoint() else {
            return;
        };
        wait_until(&endpoint.applied, || !endpoint.has_pending_updates()).await;
    }

    /// Closes the channel: rejects new traffic, drains, then stops.
    ///
    /// Outbound messages get up to the exchange's drain timeout to reach
    /// their destinations, the inbox is applied one last time, and only then
    /// is the channel detached and its task stopped.
    pub async fn close(&self) -> ReplicationResult<()> {
        let endpoint = self.endpoint()?;
        if !endpoint.open.swap(false, AtomicOrdering::SeqCst) {
            return Err(ReplicationError::ChannelClosed);
        }
        let id = endpoint.id;
        info!("Closing channel for replica {}", id);

        let drain = self.exchange.config().drain_timeout;
        if tokio::time::timeout(drain, self.exchange.wait_for_deliveries(id))
            .await
            .is_err()
        {
            warn!("Replica {} closed with undelivered messages", id);
        }

        let applied = endpoint.apply_pending();
        if endpoint.has_pending_updates() {
            warn!("Replica {} closed with unapplied messages", id);
        }
        self.exchange.detach(id);

        self.cancel.cancel();
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Apply loop for {} ended abnormally: {}", id, e);
            }
        }
        debug!("Channel for {} closed after applying {} final message(s)", id, applied);
        Ok(())
    }
}

impl<M: UpdateMessage> Drop for DeliveryChannel<M> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(id) = self.id() {
            self.exchange.detach(id);
        }
    }
}

fn spawn_apply_loop<M: UpdateMessage>(
    endpoint: Arc<ChannelEndpoint<M>>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            endpoint.apply_pending();
        }
        debug!("Apply loop for {} stopped", endpoint.id);
    })
}

//! Replication protocol stack and replicated CRDTs for Concord.
//!
//! # Architecture
//!
//! Replicas of one logical data type share a [`DeliveryExchange`]. Each
//! replica owns a [`DeliveryChannel`] bound to it at construction:
//!
//! ```text
//! replica A ─┐                         ┌─> channel B inbox ─> replica B
//!            ├─> DeliveryExchange ─────┤
//! replica C ─┘    (fan-out, retry)     └─> channel C inbox ─> replica C
//! ```
//!
//! ## Components
//!
//! - **Protocol**: [`OperationMessage`] and [`SnapshotMessage`] envelopes
//! - **Channel**: registration, inbox ordering and periodic application
//! - **Exchange**: at-least-once fan-out; [`LocalDeliveryExchange`] runs in process
//! - **Bases**: [`CommutativeReplica`] (operation-based, causal delivery) and
//!   [`ConvergentReplica`] (state-based, any order)
//! - **Replicated types**: [`GCounter`], [`PNCounter`], [`GSet`],
//!   [`CommutativeGSet`], [`TwoPhaseSet`], [`CommutativeTwoPhaseSet`],
//!   [`LWWRegister`]
//!
//! Local operations mutate state synchronously and return; delivery happens
//! on background Tokio tasks, so replicas must be created inside a runtime.
//!
//! # Example
//!
//! ```
//! use concord_sync::{GCounter, LocalDeliveryExchange, ReplicationConfig, Updatable};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> concord_sync::ReplicationResult<()> {
//! let exchange = LocalDeliveryExchange::new(ReplicationConfig::default());
//! let a = GCounter::new(exchange.clone())?;
//! let b = GCounter::new(exchange.clone())?;
//!
//! a.increment()?;
//! a.channel().wait_for_deliveries().await;
//! b.channel().wait_for_updates().await;
//! assert_eq!(b.value(), 1);
//! # Ok(())
//! # }
//! ```

mod channel;
mod commutative;
mod config;
mod convergent;
mod error;
mod exchange;
pub mod protocol;
mod replicated;
mod updatable;
mod util;

pub use channel::{DeliveryChannel, InboxOrder};
pub use commutative::{CommutativeReplica, OperationState};
pub use config::ReplicationConfig;
pub use convergent::{ConvergentReplica, SnapshotState};
pub use error::{ReplicationError, ReplicationResult};
pub use exchange::{DeliveryExchange, LocalDeliveryExchange};
pub use protocol::{OperationMessage, SnapshotMessage, UpdateMessage, VersionedUpdateMessage};
pub use replicated::{
    CommutativeGSet, CommutativeTwoPhaseSet, Element, GCounter, GSet, LWWRegister, PNCounter,
    TwoPhaseSet,
};
pub use updatable::{DeliveryEndpoint, Updatable};

//! Replicated CRDT instantiations.
//!
//! Each type pairs a pure state from `concord-crdt` with one of the two
//! replication bases and exposes only domain operations:
//!
//! | Type | Replication | Conflict policy |
//! |---|---|---|
//! | [`GCounter`] | state-based | pointwise max |
//! | [`PNCounter`] | state-based | pointwise max on both halves |
//! | [`GSet`] / [`CommutativeGSet`] | state / operation | union; no removal |
//! | [`TwoPhaseSet`] / [`CommutativeTwoPhaseSet`] | state / operation | remove-wins, removal is permanent |
//! | [`LWWRegister`] | state-based | version order, then timestamp, then lowest writer |

mod counters;
mod register;
mod sets;

use crate::commutative::CommutativeReplica;
use crate::convergent::ConvergentReplica;
use concord_crdt as crdt;

/// A replicated grow-only counter.
pub type GCounter = ConvergentReplica<crdt::GCounter>;

/// A replicated increment/decrement counter.
pub type PNCounter = ConvergentReplica<crdt::PNCounter>;

/// A replicated grow-only set exchanging snapshots.
pub type GSet<T> = ConvergentReplica<crdt::GSet<T>>;

/// A replicated grow-only set exchanging operations.
pub type CommutativeGSet<T> = CommutativeReplica<crdt::GSet<T>>;

/// A replicated remove-wins set exchanging snapshots.
pub type TwoPhaseSet<T> = ConvergentReplica<crdt::TwoPhaseSet<T>>;

/// A replicated remove-wins set exchanging operations.
pub type CommutativeTwoPhaseSet<T> = CommutativeReplica<crdt::TwoPhaseSet<T>>;

/// A replicated last-writer-wins register.
pub type LWWRegister<T> = ConvergentReplica<crdt::LWWRegister<T>>;

/// Bounds on elements of replicated sets.
pub trait Element: Ord + Clone + std::fmt::Debug + Send + Sync + 'static {}

impl<T> Element for T where T: Ord + Clone + std::fmt::Debug + Send + Sync + 'static {}

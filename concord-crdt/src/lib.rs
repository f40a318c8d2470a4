//! Logical clocks, version vectors and CRDT states for Concord.
//!
//! Clocks:
//!
//! - [`LogicalVersion<T>`]: a single replica's monotonically increasing counter
//! - [`VersionVector<K, T>`]: causality tracking across replicas
//! - [`Dot<K, T>`]: one replica's single event
//! - [`LocalVersionVector<K, T>`]: a version vector owned by one replica
//!
//! CRDT states, usable stand-alone or through `concord-sync`:
//!
//! - [`GCounter`]: grow-only counter
//! - [`PNCounter`]: Positive-Negative Counter for distributed inc/dec
//! - [`GSet<T>`]: grow-only set
//! - [`TwoPhaseSet<T>`]: remove-wins set where removal is permanent
//! - [`LWWRegister<T>`]: Last-Writer-Wins Register for single values
//!
//! All merges in this crate satisfy the following properties:
//! - **Commutative**: merge(a, b) == merge(b, a)
//! - **Associative**: merge(merge(a, b), c) == merge(a, merge(b, c))
//! - **Idempotent**: merge(a, a) == a
//!
//! These properties ensure that replicas will converge to the same state
//! regardless of the order in which states are received.

mod crdt;
mod error;
mod gcounter;
mod gset;
mod logical_version;
mod lww_register;
mod pn_counter;
mod two_phase_set;
mod version_vector;

pub use crdt::{Clock, Commutative, Convergent};
pub use error::{CrdtError, CrdtResult};
pub use gcounter::GCounter;
pub use gset::{GSet, SetOperation};
pub use logical_version::{Counter, LogicalVersion};
pub use lww_register::LWWRegister;
pub use pn_counter::PNCounter;
pub use two_phase_set::TwoPhaseSet;
pub use version_vector::{CausalOrder, Dot, LocalVersionVector, VersionVector};

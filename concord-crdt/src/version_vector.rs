//! Version vectors for causality tracking.
//!
//! A version vector maps each replica to the number of that replica's events
//! it has seen. Replicas missing from the map are implicitly at zero. Comparing
//! two vectors tells whether one state causally follows the other, whether they
//! are identical, or whether they diverged concurrently.
//!
//! Use cases:
//! - Ordering snapshots of state-based CRDTs
//! - Detecting in-order, non-skipped delivery of operations ([`VersionVector::precedes`])
//! - Last-writer-wins tie-breaking ahead of wall-clock time

use crate::crdt::Clock;
use crate::error::CrdtResult;
use crate::logical_version::{Counter, LogicalVersion};
use concord_types::ReplicaId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Causality relationship between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CausalOrder {
    /// First version happened before second.
    Before,
    /// First version happened after second.
    After,
    /// Versions are concurrent (neither happened before the other).
    Concurrent,
    /// Versions are identical.
    Equal,
}

impl CausalOrder {
    /// Converts to a partial ordering; `None` when concurrent.
    #[must_use]
    pub fn to_ordering(self) -> Option<Ordering> {
        match self {
            Self::Before => Some(Ordering::Less),
            Self::After => Some(Ordering::Greater),
            Self::Equal => Some(Ordering::Equal),
            Self::Concurrent => None,
        }
    }
}

impl From<Ordering> for CausalOrder {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::Before,
            Ordering::Greater => Self::After,
            Ordering::Equal => Self::Equal,
        }
    }
}

/// One replica's event: the replica id and its local counter at that event.
///
/// Attached to every operation message so receivers can check per-origin order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dot<K = ReplicaId, T = u64> {
    id: K,
    version: LogicalVersion<T>,
}

impl<K: Ord + Clone, T: Counter> Dot<K, T> {
    /// Creates a dot for replica `id` at `version`.
    #[must_use]
    pub fn new(id: K, version: impl Into<LogicalVersion<T>>) -> Self {
        Self {
            id,
            version: version.into(),
        }
    }

    /// Returns the originating replica.
    #[must_use]
    pub fn id(&self) -> &K {
        &self.id
    }

    /// Returns the replica's counter at this event.
    #[must_use]
    pub fn version(&self) -> LogicalVersion<T> {
        self.version
    }

    /// Returns the next event of the same replica.
    pub fn next(&self) -> CrdtResult<Self> {
        let mut version = self.version;
        version.increment()?;
        Ok(Self {
            id: self.id.clone(),
            version,
        })
    }

    /// Returns this dot as a dotted version vector.
    #[must_use]
    pub fn to_vector(&self) -> VersionVector<K, T> {
        VersionVector::from_dot(self.clone())
    }
}

impl<K: fmt::Display, T: fmt::Display> fmt::Display for Dot<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// A mapping from replica id to logical clock.
///
/// A vector may be *dotted*: it then tracks the next event of each replica
/// it carries rather than a cumulative causal history. Causal comparisons
/// against a dotted vector only consider the ids it carries, since it says
/// nothing about the others. A dotted vector stays dotted: `increment` adds or
/// advances one replica's entry and `sync` only advances entries it already
/// carries.
///
/// `PartialEq`, `Hash` and `PartialOrd` ignore dotting and compare every id
/// pointwise with implicit zeros, so `{a: 1}` equals `{a: 1, b: 0}`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize, T: Serialize",
    deserialize = "K: Ord + Deserialize<'de>, T: Deserialize<'de>"
))]
pub struct VersionVector<K = ReplicaId, T = u64> {
    /// Map from replica id to that replica's clock.
    clocks: BTreeMap<K, LogicalVersion<T>>,
    #[serde(default)]
    dotted: bool,
}

impl<K: Ord + Clone, T: Counter> VersionVector<K, T> {
    /// Creates a new empty (all-zero) vector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clocks: BTreeMap::new(),
            dotted: false,
        }
    }

    /// Creates a dotted vector standing for the single event `dot`.
    #[must_use]
    pub fn from_dot(dot: Dot<K, T>) -> Self {
        let mut clocks = BTreeMap::new();
        clocks.insert(dot.id, dot.version);
        Self {
            clocks,
            dotted: true,
        }
    }

    /// Returns true if this vector represents a single event.
    #[must_use]
    pub fn is_dotted(&self) -> bool {
        self.dotted
    }

    /// Returns the clock value for a replica (zero if never seen).
    #[must_use]
    pub fn get(&self, id: &K) -> T {
        self.version(id).value()
    }

    /// Returns the logical version for a replica (zero if never seen).
    #[must_use]
    pub fn version(&self, id: &K) -> LogicalVersion<T> {
        self.clocks.get(id).copied().unwrap_or_default()
    }

    /// Returns the dot of `id`'s latest event seen by this vector.
    #[must_use]
    pub fn dot(&self, id: &K) -> Dot<K, T> {
        Dot::new(id.clone(), self.version(id))
    }

    /// Returns every replica id with an explicit entry.
    pub fn ids(&self) -> impl Iterator<Item = &K> {
        self.clocks.keys()
    }

    /// Returns every explicit `(id, clock)` entry.
    pub fn iter(&self) -> impl Iterator<Item = (&K, T)> {
        self.clocks.iter().map(|(id, v)| (id, v.value()))
    }

    /// Returns the number of explicit entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    /// Returns true if the vector has no explicit entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Returns the sum of all clocks.
    #[must_use]
    pub fn total(&self) -> u128 {
        self.clocks.values().map(|v| v.value().widen()).sum()
    }

    /// Records one more event of `id` and returns its new clock value.
    ///
    /// On overflow the vector is left unchanged.
    pub fn increment(&mut self, id: K) -> CrdtResult<T> {
        let mut clock = self.version(&id);
        let value = clock.increment()?;
        self.clocks.insert(id, clock);
        Ok(value)
    }

    /// Advances every entry to the maximum of this vector and `other`.
    ///
    /// A dotted vector only advances its own entry.
    pub fn sync(&mut self, other: &Self) {
        if self.dotted {
            for (id, clock) in self.clocks.iter_mut() {
                clock.sync(&other.version(id));
            }
            return;
        }
        for (id, clock) in &other.clocks {
            self.clocks.entry(id.clone()).or_default().sync(clock);
        }
    }

    /// Returns a new vector that is the sync of this one and another.
    #[must_use]
    pub fn synced(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.sync(other);
        result
    }

    /// Returns what this vector would look like after one more event of `id`.
    ///
    /// Computed from a single consistent read of `self`; the borrow rules
    /// guarantee no concurrent writer can interleave between reading the
    /// vector and reading `id`'s clock.
    pub fn successor(&self, id: K) -> CrdtResult<Self> {
        let mut next = self.clone();
        next.increment(id)?;
        Ok(next)
    }

    /// Compares this vector with another to determine causal ordering.
    #[must_use]
    pub fn compare(&self, other: &Self) -> CausalOrder {
        self.compare_over(other, self.comparison_ids(other))
    }

    /// Returns true if this vector is pointwise `<=` `other` and not identical.
    #[must_use]
    pub fn happened_before(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Before
    }

    /// Returns true if `other` is pointwise `<=` this vector and not identical.
    #[must_use]
    pub fn happened_after(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::After
    }

    /// Returns true if neither vector dominates the other.
    #[must_use]
    pub fn concurrent_with(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }

    /// Returns true if both vectors agree on every compared id, implicit zeros included.
    #[must_use]
    pub fn identical(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Equal
    }

    /// Returns true if this vector is `>=` `other` on every compared id.
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        matches!(self.compare(other), CausalOrder::After | CausalOrder::Equal)
    }

    /// Returns true if `other` is this vector's direct causal successor.
    ///
    /// That is: exactly one id differs, and on that id `other` is exactly one
    /// increment ahead. Two or more differing ids is concurrency, never
    /// precedence, even if every difference is `+1`.
    #[must_use]
    pub fn precedes(&self, other: &Self) -> bool {
        let mut stepped = false;
        for id in self.comparison_ids(other) {
            let (mine, theirs) = (self.version(id), other.version(id));
            if mine == theirs {
                continue;
            }
            if stepped || !mine.precedes(&theirs) {
                return false;
            }
            stepped = true;
        }
        stepped
    }

    /// Ids considered by causal comparison: a dotted side restricts the set
    /// to the ids it carries.
    fn comparison_ids<'a>(&'a self, other: &'a Self) -> BTreeSet<&'a K> {
        match (self.dotted, other.dotted) {
            (false, false) => self.clocks.keys().chain(other.clocks.keys()).collect(),
            (true, false) => self.clocks.keys().collect(),
            (false, true) => other.clocks.keys().collect(),
            (true, true) => self.clocks.keys().chain(other.clocks.keys()).collect(),
        }
    }

    /// Compares every id with an explicit entry on either side, ignoring dotting.
    fn pointwise(&self, other: &Self) -> Option<Ordering> {
        let ids = self.clocks.keys().chain(other.clocks.keys()).collect();
        self.compare_over(other, ids).to_ordering()
    }

    fn compare_over(&self, other: &Self, ids: BTreeSet<&K>) -> CausalOrder {
        let mut behind = false; // self < other somewhere
        let mut ahead = false; // self > other somewhere

        for id in ids {
            match self.version(id).cmp(&other.version(id)) {
                Ordering::Less => behind = true,
                Ordering::Greater => ahead = true,
                Ordering::Equal => {}
            }
        }

        match (behind, ahead) {
            (false, false) => CausalOrder::Equal,
            (true, false) => CausalOrder::Before,
            (false, true) => CausalOrder::After,
            (true, true) => CausalOrder::Concurrent,
        }
    }
}

impl<K: Ord + Clone, T: Counter> Default for VersionVector<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, T: Counter> PartialEq for VersionVector<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.pointwise(other) == Some(Ordering::Equal)
    }
}

impl<K: Ord + Clone, T: Counter> Eq for VersionVector<K, T> {}

impl<K: Ord + Clone, T: Counter> PartialOrd for VersionVector<K, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.pointwise(other)
    }
}

impl<K: Ord + Clone + Hash, T: Counter> Hash for VersionVector<K, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Zero entries are skipped so equal vectors hash equally.
        for (id, clock) in self.clocks.iter().filter(|(_, v)| !v.is_zero()) {
            id.hash(state);
            clock.hash(state);
        }
    }
}

impl<K: fmt::Debug, T: fmt::Debug> fmt::Debug for VersionVector<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dotted {
            f.write_str("dotted ")?;
        }
        f.debug_map().entries(self.clocks.iter()).finish()
    }
}

impl<K: fmt::Display, T: fmt::Display> fmt::Display for VersionVector<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (id, clock)) in self.clocks.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}: {clock}")?;
        }
        f.write_str("}")
    }
}

impl<K: Ord + Clone, T: Counter> FromIterator<(K, T)> for VersionVector<K, T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        Self {
            clocks: iter
                .into_iter()
                .map(|(id, value)| (id, LogicalVersion::new(value)))
                .collect(),
            dotted: false,
        }
    }
}

/// A version vector owned by one replica.
///
/// The no-argument [`increment`](LocalVersionVector::increment) always
/// advances the owner's own entry, so a replica can treat its causal history
/// as a single clock while still exposing the full vector to others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize, T: Serialize",
    deserialize = "K: Ord + Deserialize<'de>, T: Deserialize<'de>"
))]
pub struct LocalVersionVector<K = ReplicaId, T = u64> {
    owner: K,
    vector: VersionVector<K, T>,
}

impl<K: Ord + Clone, T: Counter> LocalVersionVector<K, T> {
    /// Creates an all-zero vector owned by `owner`.
    #[must_use]
    pub fn new(owner: K) -> Self {
        Self::with_vector(owner, VersionVector::new())
    }

    /// Creates a vector owned by `owner` starting from an existing history.
    #[must_use]
    pub fn with_vector(owner: K, vector: VersionVector<K, T>) -> Self {
        Self { owner, vector }
    }

    /// Returns the owning replica.
    #[must_use]
    pub fn owner(&self) -> &K {
        &self.owner
    }

    /// Returns the full vector.
    #[must_use]
    pub fn vector(&self) -> &VersionVector<K, T> {
        &self.vector
    }

    /// Consumes this wrapper, returning the full vector.
    #[must_use]
    pub fn into_vector(self) -> VersionVector<K, T> {
        self.vector
    }

    /// Returns the dot of the owner's latest event.
    #[must_use]
    pub fn dot(&self) -> Dot<K, T> {
        self.vector.dot(&self.owner)
    }

    /// Records one local event and returns its dot.
    pub fn increment(&mut self) -> CrdtResult<Dot<K, T>> {
        self.vector.increment(self.owner.clone())?;
        Ok(self.dot())
    }

    /// Folds a remote vector (full or dotted) into this history.
    pub fn sync(&mut self, other: &VersionVector<K, T>) {
        self.vector.sync(other);
    }
}

impl<K: Ord + Clone, T: Counter> Clock for LocalVersionVector<K, T> {
    fn increment(&mut self) -> CrdtResult<()> {
        LocalVersionVector::increment(self).map(|_| ())
    }

    fn sync(&mut self, other: &Self) {
        self.vector.sync(&other.vector);
    }

    fn compare(&self, other: &Self) -> CausalOrder {
        self.vector.compare(&other.vector)
    }
}

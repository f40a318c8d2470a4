//! Grow-only Set (G-Set).
//!
//! Elements can only be added. Merge is set union, so concurrent additions
//! on different replicas always survive.

use crate::crdt::{Commutative, Convergent};
use crate::error::{CrdtError, CrdtResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An operation broadcast by operation-based sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOperation<T> {
    /// Adds every listed element.
    Add(Vec<T>),
    /// Removes every listed element.
    Remove(Vec<T>),
}

/// A grow-only set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GSet<T: Ord> {
    elements: BTreeSet<T>,
}

impl<T: Ord> Default for GSet<T> {
    fn default() -> Self {
        Self {
            elements: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> GSet<T> {
    /// Creates a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element. Returns true if it was not already present.
    pub fn insert(&mut self, element: T) -> bool {
        self.elements.insert(element)
    }

    /// Adds every element of `elements`.
    pub fn insert_all(&mut self, elements: impl IntoIterator<Item = T>) {
        self.elements.extend(elements);
    }

    /// Returns true if the set contains the element.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.elements.contains(element)
    }

    /// Returns the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter()
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T: Ord + Clone> Convergent for GSet<T> {
    fn merge(&mut self, other: &Self) {
        self.elements.extend(other.elements.iter().cloned());
    }
}

impl<T: Ord + Clone> Commutative for GSet<T> {
    type Operation = SetOperation<T>;

    fn prepare(&self, operation: &Self::Operation) -> CrdtResult<()> {
        match operation {
            SetOperation::Add(_) => Ok(()),
            SetOperation::Remove(_) => Err(CrdtError::Unsupported("remove on a grow-only set")),
        }
    }

    fn apply(&mut self, operation: &Self::Operation) {
        // Remove never passes `prepare`, so it cannot originate anywhere.
        if let SetOperation::Add(elements) = operation {
            self.insert_all(elements.iter().cloned());
        }
    }
}

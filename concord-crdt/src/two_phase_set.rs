//! Two-Phase Set (2P-Set).
//!
//! Two grow-only sets: additions and removals (tombstones). An element is
//! present if it was added and never removed. Removal is permanent, so the
//! set is remove-wins: a concurrent add and remove of the same element always
//! resolves to absent, on every replica, in any delivery order.

use crate::crdt::{Commutative, Convergent};
use crate::error::{CrdtError, CrdtResult};
use crate::gset::SetOperation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A two-phase (add-then-remove-forever) set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoPhaseSet<T: Ord> {
    added: BTreeSet<T>,
    removed: BTreeSet<T>,
}

impl<T: Ord> Default for TwoPhaseSet<T> {
    fn default() -> Self {
        Self {
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone + fmt::Debug> TwoPhaseSet<T> {
    /// Creates a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element.
    ///
    /// Fails with [`CrdtError::InsertionFailed`] if it was ever removed.
    pub fn insert(&mut self, element: T) -> CrdtResult<()> {
        self.insert_all([element])
    }

    /// Adds every element, or none of them.
    ///
    /// If any element was ever removed, fails with
    /// [`CrdtError::InsertionFailed`] naming all such elements, and the set
    /// is left unchanged.
    pub fn insert_all(&mut self, elements: impl IntoIterator<Item = T>) -> CrdtResult<()> {
        let elements: Vec<T> = elements.into_iter().collect();
        self.check_insertable(&elements)?;
        self.added.extend(elements);
        Ok(())
    }

    /// Removes an element permanently. Always succeeds.
    ///
    /// Removing an element that was never added still records the tombstone,
    /// which is what lets a concurrent add on another replica lose.
    pub fn remove(&mut self, element: T) {
        self.removed.insert(element);
    }

    /// Removes every element permanently.
    pub fn remove_all(&mut self, elements: impl IntoIterator<Item = T>) {
        self.removed.extend(elements);
    }

    /// Returns true if the element was added and never removed.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.added.contains(element) && !self.removed.contains(element)
    }

    /// Returns true if the element has been removed (and can never return).
    #[must_use]
    pub fn is_removed(&self, element: &T) -> bool {
        self.removed.contains(element)
    }

    /// Returns the live elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.added.difference(&self.removed)
    }

    /// Returns the number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns true if there are no live elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    fn check_insertable(&self, elements: &[T]) -> CrdtResult<()> {
        let rejected: Vec<&T> = elements
            .iter()
            .filter(|e| self.removed.contains(e))
            .collect();
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(CrdtError::insertion_failed(rejected))
        }
    }
}

impl<T: Ord + Clone> Convergent for TwoPhaseSet<T> {
    fn merge(&mut self, other: &Self) {
        self.added.extend(other.added.iter().cloned());
        self.removed.extend(other.removed.iter().cloned());
    }
}

impl<T: Ord + Clone + fmt::Debug> Commutative for TwoPhaseSet<T> {
    type Operation = SetOperation<T>;

    fn prepare(&self, operation: &Self::Operation) -> CrdtResult<()> {
        match operation {
            SetOperation::Add(elements) => self.check_insertable(elements),
            SetOperation::Remove(_) => Ok(()),
        }
    }

    fn apply(&mut self, operation: &Self::Operation) {
        // Remote adds are recorded even for removed elements; `contains`
        // keeps them hidden.
        match operation {
            SetOperation::Add(elements) => self.added.extend(elements.iter().cloned()),
            SetOperation::Remove(elements) => self.removed.extend(elements.iter().cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove() {
        let mut s = TwoPhaseSet::new();
        s.insert("apple").unwrap();
        s.insert("banana").unwrap();
        s.remove("banana");
        assert!(s.contains(&"apple"));
        assert!(!s.contains(&"banana"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn re_add_after_remove_fails_without_partial_mutation() {
        let mut s = TwoPhaseSet::new();
        s.remove("gone");
        let err = s.insert_all(["fresh", "gone"]).unwrap_err();
        assert_eq!(
            err,
            CrdtError::InsertionFailed {
                elements: vec!["\"gone\"".to_string()]
            }
        );
        assert!(!s.contains(&"fresh"));
        assert!(s.is_empty());
    }

    #[test]
    fn remove_wins_on_merge() {
        let mut a = TwoPhaseSet::new();
        a.insert(7).unwrap();
        let mut b = TwoPhaseSet::new();
        b.remove(7);

        assert!(!a.merged(&b).contains(&7));
        assert!(!b.merged(&a).contains(&7));
    }

    #[test]
    fn remote_add_of_removed_element_stays_hidden() {
        let mut s = TwoPhaseSet::new();
        s.apply(&SetOperation::Remove(vec![1]));
        s.apply(&SetOperation::Add(vec![1, 2]));
        assert!(!s.contains(&1));
        assert!(s.contains(&2));
    }

    #[test]
    fn prepare_rejects_local_add_of_removed() {
        let mut s = TwoPhaseSet::new();
        s.remove(3);
        assert!(s.prepare(&SetOperation::Add(vec![3])).is_err());
        assert!(s.prepare(&SetOperation::Remove(vec![3])).is_ok());
    }
}

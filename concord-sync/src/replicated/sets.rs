//! Set replica operations, for both replication bases.

use super::Element;
use crate::commutative::CommutativeReplica;
use crate::convergent::ConvergentReplica;
use crate::error::ReplicationResult;
use concord_crdt::{self as crdt, CrdtError, SetOperation};

// ── State-based ──────────────────────────────────────────────────

impl<T: Element> ConvergentReplica<crdt::GSet<T>> {
    /// Adds an element.
    pub fn add(&self, element: T) -> ReplicationResult<()> {
        self.add_all([element])
    }

    /// Adds every element in one update.
    pub fn add_all(&self, elements: impl IntoIterator<Item = T>) -> ReplicationResult<()> {
        self.mutate(|set| {
            set.insert_all(elements);
            Ok(())
        })
    }

    /// Always fails: grow-only sets never remove.
    pub fn remove(&self, _element: T) -> ReplicationResult<()> {
        Err(CrdtError::Unsupported("remove on a grow-only set").into())
    }

    /// Returns true if the element is present.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.read(|set| set.contains(element))
    }

    /// Returns the elements in order.
    #[must_use]
    pub fn elements(&self) -> Vec<T> {
        self.read(|set| set.iter().cloned().collect())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(crdt::GSet::len)
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read(crdt::GSet::is_empty)
    }
}

impl<T: Element> ConvergentReplica<crdt::TwoPhaseSet<T>> {
    /// Adds an element.
    ///
    /// Fails with [`CrdtError::InsertionFailed`] if it was ever removed.
    pub fn add(&self, element: T) -> ReplicationResult<()> {
        self.add_all([element])
    }

    /// Adds every element, or none of them if any was ever removed.
    pub fn add_all(&self, elements: impl IntoIterator<Item = T>) -> ReplicationResult<()> {
        self.mutate(|set| set.insert_all(elements))
    }

    /// Removes an element permanently.
    pub fn remove(&self, element: T) -> ReplicationResult<()> {
        self.remove_all([element])
    }

    /// Removes every element permanently.
    pub fn remove_all(&self, elements: impl IntoIterator<Item = T>) -> ReplicationResult<()> {
        self.mutate(|set| {
            set.remove_all(elements);
            Ok(())
        })
    }

    /// Returns true if the element was added and never removed.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.read(|set| set.contains(element))
    }

    /// Returns the live elements in order.
    #[must_use]
    pub fn elements(&self) -> Vec<T> {
        self.read(|set| set.iter().cloned().collect())
    }

    /// Returns the number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(crdt::TwoPhaseSet::len)
    }

    /// Returns true if there are no live elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read(crdt::TwoPhaseSet::is_empty)
    }
}

// ── Operation-based ──────────────────────────────────────────────

impl<T: Element> CommutativeReplica<crdt::GSet<T>> {
    /// Adds an element.
    pub fn add(&self, element: T) -> ReplicationResult<()> {
        self.add_all([element])
    }

    /// Adds every element in one operation.
    pub fn add_all(&self, elements: impl IntoIterator<Item = T>) -> ReplicationResult<()> {
        self.submit(SetOperation::Add(elements.into_iter().collect()))
    }

    /// Always fails: grow-only sets never remove.
    ///
    /// Returns [`CrdtError::Unsupported`] while the channel is open and
    /// [`ReplicationError::ChannelClosed`] once it is closed.
    ///
    /// [`ReplicationError::ChannelClosed`]: crate::ReplicationError::ChannelClosed
    pub fn remove(&self, element: T) -> ReplicationResult<()> {
        self.submit(SetOperation::Remove(vec![element]))
    }

    /// Returns true if the element is present.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.read(|set| set.contains(element))
    }

    /// Returns the elements in order.
    #[must_use]
    pub fn elements(&self) -> Vec<T> {
        self.read(|set| set.iter().cloned().collect())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(crdt::GSet::len)
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read(crdt::GSet::is_empty)
    }
}

impl<T: Element> CommutativeReplica<crdt::TwoPhaseSet<T>> {
    /// Adds an element.
    ///
    /// Fails with [`CrdtError::InsertionFailed`] if it was ever removed.
    pub fn add(&self, element: T) -> ReplicationResult<()> {
        self.add_all([element])
    }

    /// Adds every element in one operation, or none if any was ever removed.
    pub fn add_all(&self, elements: impl IntoIterator<Item = T>) -> ReplicationResult<()> {
        self.submit(SetOperation::Add(elements.into_iter().collect()))
    }

    /// Removes an element permanently.
    pub fn remove(&self, element: T) -> ReplicationResult<()> {
        self.remove_all([element])
    }

    /// Removes every element permanently in one operation.
    pub fn remove_all(&self, elements: impl IntoIterator<Item = T>) -> ReplicationResult<()> {
        self.submit(SetOperation::Remove(elements.into_iter().collect()))
    }

    /// Returns true if the element was added and never removed.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.read(|set| set.contains(element))
    }

    /// Returns the live elements in order.
    #[must_use]
    pub fn elements(&self) -> Vec<T> {
        self.read(|set| set.iter().cloned().collect())
    }

    /// Returns the number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(crdt::TwoPhaseSet::len)
    }

    /// Returns true if there are no live elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read(crdt::TwoPhaseSet::is_empty)
    }
}

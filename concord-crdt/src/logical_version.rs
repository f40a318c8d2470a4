//! Scalar logical clocks.
//!
//! A [`LogicalVersion`] is one replica's event counter. It only ever moves
//! forward: [`LogicalVersion::increment`] fails at the numeric maximum
//! instead of wrapping, since a wrapped clock would read as "older" and
//! silently corrupt causal order.

use crate::crdt::Clock;
use crate::error::{CrdtError, CrdtResult};
use crate::version_vector::CausalOrder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// An unsigned integer usable as a logical clock value.
pub trait Counter:
    Copy + Ord + Hash + Default + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The initial clock value.
    const ZERO: Self;

    /// Returns `self + 1`, or `None` at the type's maximum.
    fn checked_increment(self) -> Option<Self>;

    /// Widens to `u128` for summing many clocks without overflow.
    fn widen(self) -> u128;
}

macro_rules! impl_counter {
    ($($t:ty),*) => {
        $(
            impl Counter for $t {
                const ZERO: Self = 0;

                fn checked_increment(self) -> Option<Self> {
                    self.checked_add(1)
                }

                fn widen(self) -> u128 {
                    self as u128
                }
            }
        )*
    };
}

impl_counter!(u8, u16, u32, u64, usize);

/// A monotonically increasing logical timestamp.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalVersion<T = u64>(T);

impl<T: Counter> LogicalVersion<T> {
    /// The zero version. Every clock starts here.
    pub const ZERO: Self = Self(T::ZERO);

    /// Creates a version at an explicit value.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self(value)
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.0
    }

    /// Returns true if no event has been counted yet.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == T::ZERO
    }

    /// Advances by one and returns the new value.
    ///
    /// At the numeric maximum this returns [`CrdtError::ClockOverflow`] and
    /// the version is left unchanged.
    pub fn increment(&mut self) -> CrdtResult<T> {
        let next = self.0.checked_increment().ok_or(CrdtError::ClockOverflow)?;
        self.0 = next;
        Ok(next)
    }

    /// Moves to `max(self, other)`.
    pub fn sync(&mut self, other: &Self) {
        if other.0 > self.0 {
            self.0 = other.0;
        }
    }

    /// Returns true if `other` is exactly one step ahead of `self`.
    #[must_use]
    pub fn precedes(&self, other: &Self) -> bool {
        self.0.checked_increment() == Some(other.0)
    }
}

impl<T: Counter> Clock for LogicalVersion<T> {
    fn increment(&mut self) -> CrdtResult<()> {
        LogicalVersion::increment(self).map(|_| ())
    }

    fn sync(&mut self, other: &Self) {
        LogicalVersion::sync(self, other);
    }

    fn compare(&self, other: &Self) -> CausalOrder {
        self.0.cmp(&other.0).into()
    }
}

impl<T> From<T> for LogicalVersion<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for LogicalVersion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: fmt::Display> fmt::Display for LogicalVersion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

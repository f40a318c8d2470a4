//! Error types for clocks and CRDT states.

use thiserror::Error;

/// Result type for clock and CRDT operations.
pub type CrdtResult<T> = Result<T, CrdtError>;

/// Errors raised synchronously by clocks and CRDT operations.
///
/// Every operation that returns one of these leaves its receiver unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrdtError {
    /// A logical clock is already at its type's maximum.
    #[error("logical clock overflow")]
    ClockOverflow,

    /// The data type does not support this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Elements were permanently removed and can never be added again.
    #[error("cannot add permanently removed element(s): {}", elements.join(", "))]
    InsertionFailed {
        /// `Debug` rendering of each offending element.
        elements: Vec<String>,
    },
}

impl CrdtError {
    pub(crate) fn insertion_failed<'a, T, I>(elements: I) -> Self
    where
        T: std::fmt::Debug + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        Self::InsertionFailed {
            elements: elements.into_iter().map(|e| format!("{e:?}")).collect(),
        }
    }
}

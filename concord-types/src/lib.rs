//! Core type definitions for Concord.
//!
//! This crate defines the leaf types shared by every replica:
//! - Replica identifiers (UUID v7) and the factories that mint them
//! - Millisecond-resolution UTC timestamps for last-writer-wins ordering
//!
//! Clocks, version vectors and the CRDT states themselves live in
//! `concord-crdt`; the replication protocol lives in `concord-sync`.

mod ids;
mod timestamp;

pub use ids::{IdentifierFactory, ReplicaId, UuidIdentifierFactory};
pub use timestamp::UtcTimestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

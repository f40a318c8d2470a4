//! Replica identifiers and the factories that issue them.
//!
//! Uses UUID v7 so identifiers are globally unique and roughly time-ordered.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for one replica of a replicated data type.
///
/// Opaque to the clock and CRDT layers: they only rely on `Ord + Hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(Uuid);

impl ReplicaId {
    /// Creates a new replica ID with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a replica ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a replica ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ReplicaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReplicaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Issues identifiers that are never repeated by the same factory instance.
pub trait IdentifierFactory<K>: Send + Sync {
    /// Returns an identifier this factory has not issued before.
    fn create(&self) -> K;
}

/// Default factory for [`ReplicaId`]s, backed by UUID v7 generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdentifierFactory;

impl IdentifierFactory<ReplicaId> for UuidIdentifierFactory {
    fn create(&self) -> ReplicaId {
        ReplicaId::new()
    }
}

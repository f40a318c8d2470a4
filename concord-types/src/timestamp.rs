//! UTC wall-clock timestamps with millisecond resolution.
//!
//! Used as the second-level tie-break of last-writer-wins registers, after
//! causal order. Two writes inside the same millisecond compare equal, which
//! is why writers that need strictly increasing stamps call [`UtcTimestamp::after`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Milliseconds since the Unix epoch, in UTC.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UtcTimestamp(i64);

impl UtcTimestamp {
    /// The Unix epoch. Used as the timestamp of a register that was never written.
    pub const EPOCH: Self = Self(0);

    /// Reads the current wall clock.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the following millisecond, saturating at the maximum.
    #[must_use]
    pub const fn next_millis(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Converts to a `chrono` datetime.
    pub fn to_datetime(&self) -> crate::Result<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
            .ok_or_else(|| crate::Error::InvalidTimestamp(format!("{} ms out of range", self.0)))
    }

    /// Returns a wall-clock reading strictly greater than `previous`.
    ///
    /// If the clock still reads the same millisecond, this blocks the calling
    /// thread until it advances. If the clock reads *earlier* than `previous` (the clock was
    /// stepped back), the result is `previous + 1ms` instead of waiting out
    /// the regression.
    #[must_use]
    pub fn after(previous: Self) -> Self {
        loop {
            let now = Self::now();
            if now > previous {
                return now;
            }
            if now < previous {
                return previous.next_millis();
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl From<DateTime<Utc>> for UtcTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.timestamp_millis())
    }
}

impl fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::from_timestamp_millis(self.0) {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

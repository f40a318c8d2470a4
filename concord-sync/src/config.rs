//! Replication configuration.

use std::time::Duration;

/// Timing knobs for exchanges and channels.
///
/// The exchange owns the configuration; every channel attached to it
/// inherits the same values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationConfig {
    /// Period of the exchange's fan-out cycle.
    pub delivery_interval: Duration,
    /// Period of each channel's apply cycle.
    pub apply_interval: Duration,
    /// Upper bound on draining queued work when closing.
    pub drain_timeout: Duration,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            delivery_interval: Duration::from_millis(20),
            apply_interval: Duration::from_millis(20),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl ReplicationConfig {
    /// Sets the exchange's fan-out period.
    #[must_use]
    pub fn with_delivery_interval(mut self, interval: Duration) -> Self {
        self.delivery_interval = interval;
        self
    }

    /// Sets the channels' apply period.
    #[must_use]
    pub fn with_apply_interval(mut self, interval: Duration) -> Self {
        self.apply_interval = interval;
        self
    }

    /// Sets the drain bound used by `close` and `shutdown`.
    #[must_use]
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}

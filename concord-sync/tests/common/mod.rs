//! Shared helpers for replication tests.

#![allow(dead_code)]

use concord_sync::{ReplicationConfig, Updatable};
use concord_types::ReplicaId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Installs a `RUST_LOG`-filtered subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fast cycles so tests settle quickly.
pub fn fast_config() -> ReplicationConfig {
    ReplicationConfig::default()
        .with_delivery_interval(Duration::from_millis(2))
        .with_apply_interval(Duration::from_millis(2))
        .with_drain_timeout(Duration::from_secs(2))
}

/// Deterministic replica IDs for reproducibility.
pub fn replica(n: u8) -> ReplicaId {
    ReplicaId::from_uuid(uuid::Uuid::from_bytes([
        n, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ]))
}

/// Awaits `future`, failing the test if it takes longer than [`WAIT`].
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out waiting for replication")
}

/// Waits until every replica has sent and applied everything.
pub async fn settle<U: Updatable>(replicas: &[&Arc<U>]) {
    for replica in replicas {
        within(replica.channel().wait_for_deliveries()).await;
    }
    for replica in replicas {
        within(replica.channel().wait_for_updates()).await;
    }
}

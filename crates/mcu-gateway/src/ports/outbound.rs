//! Outbound ports for the gateway.

use crate::domain::{ClusterRecord, StoreError};
use async_trait::async_trait;

/// Shared key-value cache.
///
/// Holds administrative credentials keyed by username and the telemetry
/// snapshot under a fixed key. Values are JSON text.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Fetch a value. `Ok(None)` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Document store of registered cluster nodes.
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    /// Find the registration whose address equals `address`.
    async fn find_one_by_address(&self, address: &str)
        -> Result<Option<ClusterRecord>, StoreError>;
}

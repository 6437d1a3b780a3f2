//! Telemetry state relay.
//!
//! Cluster nodes overwrite one shared snapshot; administrative clients read
//! it back. Last write wins, there is no history.

use crate::domain::RelayError;
use crate::ports::KeyValueCache;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

pub struct TelemetryRelay {
    cache: Arc<dyn KeyValueCache>,
    key: String,
}

impl TelemetryRelay {
    pub fn new(cache: Arc<dyn KeyValueCache>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the snapshot. The payload is stored as-is, `null` included.
    pub async fn write(&self, payload: &Value) -> Result<(), RelayError> {
        let encoded = serde_json::to_string(payload)?;
        trace!(key = %self.key, bytes = encoded.len(), "Writing telemetry snapshot");
        self.cache.set(&self.key, encoded).await?;
        Ok(())
    }

    /// Current snapshot, or [`RelayError::NotFound`] before the first write.
    pub async fn read(&self) -> Result<Value, RelayError> {
        let raw = self
            .cache
            .get(&self.key)
            .await?
            .ok_or(RelayError::NotFound)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

//! Envelope handlers registered in the dispatcher's routing table.

use super::relay::TelemetryRelay;
use crate::domain::{AuthResult, DispatchError, Envelope};
use crate::metrics::GatewayMetrics;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Handles one validated envelope for an authenticated connection.
///
/// `Ok(Some(_))` is sent back to the same peer; `Ok(None)` sends nothing.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle(
        &self,
        envelope: Envelope,
        auth: &AuthResult,
    ) -> Result<Option<Envelope>, DispatchError>;
}

/// `cluster` + `systemInfo`: overwrite the shared snapshot.
pub struct PushTelemetry {
    relay: Arc<TelemetryRelay>,
    metrics: Arc<GatewayMetrics>,
}

impl PushTelemetry {
    pub fn new(relay: Arc<TelemetryRelay>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { relay, metrics }
    }
}

#[async_trait]
impl EnvelopeHandler for PushTelemetry {
    async fn handle(
        &self,
        envelope: Envelope,
        auth: &AuthResult,
    ) -> Result<Option<Envelope>, DispatchError> {
        self.relay.write(&envelope.message_or_null()).await?;
        self.metrics.record_snapshot_written();
        debug!(peer = %auth.peer(), "Telemetry snapshot updated");
        Ok(None)
    }
}

/// `web` + `systemInfo`: reply with the current snapshot.
pub struct PullTelemetry {
    relay: Arc<TelemetryRelay>,
    metrics: Arc<GatewayMetrics>,
}

impl PullTelemetry {
    pub fn new(relay: Arc<TelemetryRelay>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { relay, metrics }
    }
}

#[async_trait]
impl EnvelopeHandler for PullTelemetry {
    async fn handle(
        &self,
        _envelope: Envelope,
        _auth: &AuthResult,
    ) -> Result<Option<Envelope>, DispatchError> {
        let snapshot = self.relay.read().await?;
        self.metrics.record_snapshot_read();
        Ok(Some(Envelope::system_info(snapshot)))
    }
}

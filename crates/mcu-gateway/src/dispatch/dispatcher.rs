//! Per-frame message dispatch.
//!
//! Validates each inbound frame, routes it by the connection's role and the
//! envelope's event name, and turns every failure into an
//! `ERR_MESSAGE_PARSE` reply. A failure never closes the connection.

use super::handlers::{EnvelopeHandler, PullTelemetry, PushTelemetry};
use super::relay::TelemetryRelay;
use crate::adapters::GatewayEvents;
use crate::domain::{names, AuthResult, DispatchError, Envelope, Role};
use crate::metrics::GatewayMetrics;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routing table from (role, event name) to handler.
#[derive(Default, Clone)]
pub struct RoutingTable {
    routes: HashMap<Role, HashMap<String, Arc<dyn EnvelopeHandler>>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gateway's fixed table: cluster nodes push `systemInfo`, admin
    /// clients pull it.
    pub fn telemetry(relay: Arc<TelemetryRelay>, metrics: Arc<GatewayMetrics>) -> Self {
        Self::new()
            .route(
                Role::Cluster,
                names::SYSTEM_INFO,
                Arc::new(PushTelemetry::new(relay.clone(), metrics.clone())),
            )
            .route(
                Role::Web,
                names::SYSTEM_INFO,
                Arc::new(PullTelemetry::new(relay, metrics)),
            )
    }

    pub fn route(
        mut self,
        role: Role,
        event: impl Into<String>,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Self {
        self.routes
            .entry(role)
            .or_default()
            .insert(event.into(), handler);
        self
    }

    pub fn lookup(&self, role: Role, event: &str) -> Option<&Arc<dyn EnvelopeHandler>> {
        self.routes.get(&role)?.get(event)
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Dispatcher {
    table: RoutingTable,
    events: GatewayEvents,
    metrics: Arc<GatewayMetrics>,
    max_message_size: usize,
}

impl Dispatcher {
    pub fn new(
        table: RoutingTable,
        events: GatewayEvents,
        metrics: Arc<GatewayMetrics>,
        max_message_size: usize,
    ) -> Self {
        Self {
            table,
            events,
            metrics,
            max_message_size,
        }
    }

    /// Handle one inbound frame. Returns the envelope to send back, if any.
    ///
    /// On failure the reply is `ERR_MESSAGE_PARSE` carrying the error text;
    /// for cluster connections the failure is also published on the bus.
    pub async fn dispatch(&self, frame: &str, auth: &AuthResult) -> Option<Envelope> {
        self.metrics.record_frame();
        debug!(peer = %auth.peer(), role = %auth.role(), bytes = frame.len(), "Inbound frame");

        match self.try_dispatch(frame, auth).await {
            Ok(reply) => reply,
            Err(e) => {
                let text = e.to_string();
                self.metrics.record_parse_failure();
                warn!(peer = %auth.peer(), role = %auth.role(), error = %text, "Failed to handle frame");

                if auth.role() == Role::Cluster {
                    self.events.cluster_parse_failure(auth.peer(), &text).await;
                }
                Some(Envelope::message_parse_error(text))
            }
        }
    }

    async fn try_dispatch(
        &self,
        frame: &str,
        auth: &AuthResult,
    ) -> Result<Option<Envelope>, DispatchError> {
        if frame.len() > self.max_message_size {
            return Err(DispatchError::FrameTooLarge {
                size: frame.len(),
                max: self.max_message_size,
            });
        }

        let envelope = Envelope::parse(frame)?;
        let Some(handler) = self.table.lookup(auth.role(), &envelope.event) else {
            self.metrics.record_dropped();
            debug!(role = %auth.role(), event = %envelope.event, "No route, dropping frame");
            return Ok(None);
        };

        handler.handle(envelope, auth).await
    }
}

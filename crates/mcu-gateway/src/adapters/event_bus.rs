//! Event bus adapter.
//!
//! Translates gateway occurrences into operational events and publishes
//! them on the shared bus. Publishing is fire-and-forget: an event nobody
//! listens to is dropped.

use crate::domain::PeerAddress;
use mcu_bus::{EventKind, EventPublisher, OperationalEvent};
use std::sync::Arc;
use tracing::trace;

/// Publishes the gateway's operational events.
#[derive(Clone)]
pub struct GatewayEvents {
    bus: Arc<dyn EventPublisher>,
}

impl GatewayEvents {
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self { bus }
    }

    /// `info`: a connection was rejected at connect time.
    pub async fn unauthorized_connection(&self, peer: &PeerAddress, reason: &str) {
        self.publish(OperationalEvent::info(
            EventKind::UnauthorizedConnection,
            format!("unauthorized websocket connection: {}", peer.address),
            reason,
        ))
        .await;
    }

    /// `error`: a cluster node sent a frame that could not be handled.
    pub async fn cluster_parse_failure(&self, peer: &PeerAddress, error: &str) {
        let mut details = peer.metadata();
        details.insert("error".into(), error.into());
        self.publish(
            OperationalEvent::error(
                EventKind::MessageParseFailure,
                format!("cluster node [ {} ] message parse error", peer.address),
                serde_json::Value::Object(details).to_string(),
            )
            .in_protocol(),
        )
        .await;
    }

    /// `error`: a cluster node disconnected.
    ///
    /// Informational content on the `error` channel; consumers that need to
    /// separate it match on [`EventKind::ClusterDisconnected`].
    pub async fn cluster_disconnected(&self, peer: &PeerAddress) {
        self.publish(
            OperationalEvent::error(
                EventKind::ClusterDisconnected,
                format!("cluster node [ {} ] disconnected", peer.address),
                serde_json::Value::Object(peer.metadata()).to_string(),
            )
            .in_protocol(),
        )
        .await;
    }

    /// `error`: socket-level error on an established connection.
    pub async fn transport_error(&self, error: &str) {
        self.publish(OperationalEvent::error(
            EventKind::TransportError,
            "websocket transport error",
            error,
        ))
        .await;
    }

    /// `error`: listener-level failure.
    pub async fn server_error(&self, error: &str) {
        self.publish(OperationalEvent::error(
            EventKind::ServerError,
            "websocket server error",
            error,
        ))
        .await;
    }

    async fn publish(&self, event: OperationalEvent) {
        let receivers = self.bus.publish(event).await;
        trace!(receivers, "Operational event handed to bus");
    }
}

//! axum WebSocket adapter.
//!
//! Bridges an upgraded socket to the transport-agnostic session: inbound
//! messages are mapped to [`Inbound`] frames, a writer task drains the
//! session's [`Outbound`] queue. Ping/pong is answered by the socket layer.
//! A peer that vanishes without a closing handshake ends the session like a
//! close frame; only protocol violations surface as [`TransportError`].

use super::session::{Inbound, LifecycleManager, Outbound, TransportError};
use crate::auth::ConnectionRequest;
use crate::domain::PeerAddress;
use crate::metrics::GatewayMetrics;
use axum::extract::ws::{Message, WebSocket};
use futures::{future, SinkExt, StreamExt};
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// WebSocket connection handler
pub struct WebSocketHandler {
    manager: Arc<LifecycleManager>,
    metrics: Arc<GatewayMetrics>,
    request: ConnectionRequest,
}

impl WebSocketHandler {
    pub fn new(
        manager: Arc<LifecycleManager>,
        metrics: Arc<GatewayMetrics>,
        request: ConnectionRequest,
    ) -> Self {
        Self {
            manager,
            metrics,
            request,
        }
    }

    /// Handle a WebSocket connection
    pub async fn handle(self, socket: WebSocket) {
        let peer = self.request.peer.clone();
        let (sink, stream) = socket.split();
        let (tx, rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(write_loop(sink, rx, peer.clone(), self.metrics));

        let inbound = stream.filter_map(|message| future::ready(to_inbound(message)));
        let state = self.manager.run(self.request, inbound, tx).await;
        debug!(peer = %peer, state = ?state, "Session finished");

        // The writer stops once every sender is gone, which includes the
        // pending ready notification.
        if let Err(e) = writer.await {
            error!(peer = %peer, error = %e, "WebSocket writer task failed");
        }
    }
}

fn to_inbound(message: Result<Message, axum::Error>) -> Option<Result<Inbound, TransportError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(Inbound::Text(text))),
        Ok(Message::Binary(data)) => Some(Ok(Inbound::Binary(data))),
        Ok(Message::Close(_)) => Some(Ok(Inbound::Close)),
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
        Err(e) if is_peer_gone(&e) => {
            debug!(error = %e, "Peer went away without closing handshake");
            Some(Ok(Inbound::Close))
        }
        Err(e) => Some(Err(TransportError(e.to_string()))),
    }
}

/// Display text of the tungstenite errors raised when the connection is
/// already gone. axum does not re-export tungstenite, so these are matched
/// by message anywhere in the error's source chain.
const PEER_GONE_MESSAGES: [&str; 3] = [
    "Connection reset without closing handshake",
    "Connection closed normally",
    "Trying to work with closed connection",
];

/// True when the error chain says the peer dropped the connection.
fn is_peer_gone(error: &axum::Error) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(e) = current {
        if let Some(io_error) = e.downcast_ref::<io::Error>() {
            if matches!(
                io_error.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        let text = e.to_string();
        if PEER_GONE_MESSAGES.iter().any(|m| text.contains(m)) {
            return true;
        }
        current = e.source();
    }
    false
}

async fn write_loop<S>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    peer: PeerAddress,
    metrics: Arc<GatewayMetrics>,
) where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    while let Some(command) = rx.recv().await {
        match command {
            Outbound::Envelope(envelope) => {
                let text = match envelope.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        error!(peer = %peer, error = %e, "Failed to encode envelope");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    // Sends to a closed peer are dropped.
                    debug!(peer = %peer, error = %e, "Failed to send envelope");
                    break;
                }
                metrics.record_sent();
            }
            Outbound::Terminate => {
                debug!(peer = %peer, "Terminating connection");
                break;
            }
        }
    }
    // Dropping the sink together with the read half closes the socket
    // without a closing handshake.
}

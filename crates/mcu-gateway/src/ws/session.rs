//! Connection lifecycle.
//!
//! ```text
//! Connecting ──► Authenticating ──► Rejected ──► (terminated)
//!                      │
//!                      └──────────► Active ──► Closed
//! ```
//!
//! A session is transport-agnostic: it reads [`Inbound`] frames from a
//! stream and queues [`Outbound`] commands for a writer. No message handler
//! is attached while authenticating: data frames already waiting when the
//! session becomes active are discarded.

use crate::adapters::GatewayEvents;
use crate::auth::{Authenticator, ConnectionRequest};
use crate::dispatch::Dispatcher;
use crate::domain::{AuthResult, Envelope, PeerAddress, Role};
use crate::metrics::GatewayMetrics;
use futures::{FutureExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Frame received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// Command for the connection writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Envelope(Envelope),
    /// Drop the connection without a closing handshake.
    Terminate,
}

/// Socket-level failure on an established connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticating,
    Rejected,
    Active,
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Rejected | SessionState::Closed)
    }
}

fn transition(peer: &PeerAddress, from: SessionState, to: SessionState) {
    trace!(peer = %peer, from = ?from, to = ?to, "Session state change");
}

/// Drives connections from accept to close.
pub struct LifecycleManager {
    authenticator: Arc<Authenticator>,
    dispatcher: Arc<Dispatcher>,
    events: GatewayEvents,
    metrics: Arc<GatewayMetrics>,
    ready_delay: Duration,
}

impl LifecycleManager {
    pub fn new(
        authenticator: Arc<Authenticator>,
        dispatcher: Arc<Dispatcher>,
        events: GatewayEvents,
        metrics: Arc<GatewayMetrics>,
        ready_delay: Duration,
    ) -> Self {
        Self {
            authenticator,
            dispatcher,
            events,
            metrics,
            ready_delay,
        }
    }

    /// Run one connection to completion and return its final state.
    pub async fn run<S>(
        &self,
        request: ConnectionRequest,
        mut inbound: S,
        outbound: mpsc::UnboundedSender<Outbound>,
    ) -> SessionState
    where
        S: Stream<Item = Result<Inbound, TransportError>> + Unpin,
    {
        debug!(peer = %request.peer, path = %request.path, "Connection opened");
        transition(&request.peer, SessionState::Connecting, SessionState::Authenticating);

        let auth = match self.authenticator.authenticate(&request).await {
            Ok(auth) => auth,
            Err(e) => {
                let reason = e.to_string();
                warn!(peer = %request.peer, path = %request.path, reason = %reason, "Rejecting connection");
                self.metrics.record_rejected();

                let _ = outbound.send(Outbound::Envelope(Envelope::authentication_failed(
                    reason.clone(),
                )));
                self.events
                    .unauthorized_connection(&request.peer, &reason)
                    .await;
                let _ = outbound.send(Outbound::Terminate);
                transition(&request.peer, SessionState::Authenticating, SessionState::Rejected);
                return SessionState::Rejected;
            }
        };

        self.metrics.record_accepted();
        transition(auth.peer(), SessionState::Authenticating, SessionState::Active);
        info!(peer = %auth.peer(), role = %auth.role(), "Connection authenticated");
        self.schedule_ready(outbound.clone());

        let mut carried = self.discard_early_frames(auth.peer(), &mut inbound);
        loop {
            let frame = match carried.take() {
                Some(frame) => frame,
                None => match inbound.next().await {
                    Some(frame) => frame,
                    None => break,
                },
            };
            match frame {
                Ok(Inbound::Text(text)) => self.handle_frame(&text, &auth, &outbound).await,
                Ok(Inbound::Binary(data)) => {
                    let text = String::from_utf8_lossy(&data);
                    self.handle_frame(&text, &auth, &outbound).await
                }
                Ok(Inbound::Close) => break,
                Err(e) => {
                    error!(peer = %auth.peer(), error = %e, "Transport error");
                    self.events.transport_error(&e.to_string()).await;
                    break;
                }
            }
        }

        self.close(&auth).await;
        transition(auth.peer(), SessionState::Active, SessionState::Closed);
        SessionState::Closed
    }

    /// Drop data frames that arrived before the session was active. Returns
    /// the first close or error found, or `None` once nothing is pending.
    fn discard_early_frames<S>(
        &self,
        peer: &PeerAddress,
        inbound: &mut S,
    ) -> Option<Result<Inbound, TransportError>>
    where
        S: Stream<Item = Result<Inbound, TransportError>> + Unpin,
    {
        let mut discarded = 0usize;
        let pending = loop {
            match inbound.next().now_or_never() {
                Some(Some(Ok(Inbound::Text(_) | Inbound::Binary(_)))) => {
                    discarded += 1;
                    self.metrics.record_dropped();
                }
                // Stream ended: report it as a close.
                Some(None) => break Some(Ok(Inbound::Close)),
                Some(Some(other)) => break Some(other),
                None => break None,
            }
        };
        if discarded > 0 {
            debug!(peer = %peer, discarded, "Discarded frames sent during authentication");
        }
        pending
    }

    async fn handle_frame(
        &self,
        text: &str,
        auth: &AuthResult,
        outbound: &mpsc::UnboundedSender<Outbound>,
    ) {
        if let Some(reply) = self.dispatcher.dispatch(text, auth).await {
            // Peer may already be gone; nothing to do then.
            let _ = outbound.send(Outbound::Envelope(reply));
        }
    }

    /// One-shot `authonload` after the ready delay. Not cancelled on close.
    fn schedule_ready(&self, outbound: mpsc::UnboundedSender<Outbound>) {
        let delay = self.ready_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = outbound.send(Outbound::Envelope(Envelope::auth_onload()));
        });
    }

    async fn close(&self, auth: &AuthResult) {
        self.metrics.record_closed();
        info!(peer = %auth.peer(), role = %auth.role(), "Connection closed");

        if auth.role() == Role::Cluster {
            self.events.cluster_disconnected(auth.peer()).await;
        }
    }
}

//! Gateway error types.
//!
//! Peer-facing errors are reduced to their `Display` text before they go on
//! the wire; nothing structural leaks to the peer.

use crate::domain::envelope::EnvelopeError;

/// Failure of an external store (cache or document store).
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but the operation failed.
    #[error("store operation failed: {0}")]
    Operation(String),
}

/// Connection-time authentication failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Path matched neither the administrative nor the cluster prefix.
    #[error("access not permitted")]
    AccessNotPermitted,

    /// `username` or `password` cookie missing.
    #[error("connection carries no token")]
    MissingToken,

    /// No credential stored for the presented username.
    #[error("user not found")]
    UserNotFound,

    /// A credential is stored but cannot be decoded.
    #[error("stored credential is malformed: {0}")]
    MalformedCredential(String),

    /// Username or password mismatch, or unregistered cluster address.
    #[error("authentication rejected")]
    Rejected,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// State relay failure.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No snapshot has been written yet.
    #[error("could not retrieve system info")]
    NotFound,

    #[error("snapshot is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure while handling one inbound frame. Never fatal to the connection.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Gateway-level errors (internal use, never sent to peers).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Listener failed while serving
    #[error("server error: {0}")]
    Serve(String),

    /// Shutdown already requested or service already started
    #[error("service is not in a startable state")]
    NotStartable,
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Serve(e.to_string())
    }
}

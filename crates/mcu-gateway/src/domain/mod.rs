//! Domain types for the gateway.
//!
//! Configuration, the wire envelope, roles and credentials, and the error
//! taxonomy. No I/O lives here.

pub mod config;
pub mod envelope;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig};
pub use envelope::{names, Envelope, EnvelopeError};
pub use error::{AuthError, DispatchError, GatewayError, RelayError, StoreError};
pub use types::{
    AddressFamily, AdminCredential, AuthResult, ClusterRecord, IdentityToken, PeerAddress, Role,
};

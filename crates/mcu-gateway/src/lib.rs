//! MCU control-plane gateway.
//!
//! Long-lived WebSocket endpoint shared by two kinds of peers: cluster nodes
//! that push telemetry snapshots and administrative clients that pull them.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          MCU GATEWAY                              │
//! ├───────────────────────────────────────────────────────────────────┤
//! │   /socket* (web)        /cluster* (cluster)      /health /metrics │
//! │         │                      │                                  │
//! │  ┌──────┴──────────────────────┴──────┐                           │
//! │  │            Authenticator            │ cookie / source address  │
//! │  └─────────────────┬──────────────────┘                           │
//! │  ┌─────────────────┴──────────────────┐                           │
//! │  │  Lifecycle manager (per connection) │──► authonload (delayed)  │
//! │  └─────────────────┬──────────────────┘                           │
//! │  ┌─────────────────┴──────────────────┐                           │
//! │  │   Dispatcher (role, event) table    │──► ERR_MESSAGE_PARSE     │
//! │  └─────────────────┬──────────────────┘                           │
//! │  ┌─────────────────┴──────────────────┐                           │
//! │  │          Telemetry relay            │                           │
//! │  └─────────────────┬──────────────────┘                           │
//! └────────────────────┼──────────────────────────────────────────────┘
//!                      │                         operational events
//!            KeyValueCache / ClusterRegistry ──────────► mcu-bus
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use mcu_gateway::{GatewayConfig, GatewayService, InMemoryCache, InMemoryClusterRegistry};
//!
//! let service = GatewayService::new(config, cache, registry, bus)?;
//! service.start(shutdown_signal).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod auth;
pub mod dispatch;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod ws;

// Re-exports for public API
pub use adapters::{GatewayEvents, InMemoryCache, InMemoryClusterRegistry};
pub use auth::{Authenticator, ConnectionRequest};
pub use dispatch::{Dispatcher, EnvelopeHandler, RoutingTable, TelemetryRelay};
pub use domain::config::GatewayConfig;
pub use domain::error::{AuthError, DispatchError, GatewayError, RelayError, StoreError};
pub use domain::types::*;
pub use domain::{names, Envelope, EnvelopeError};
pub use metrics::GatewayMetrics;
pub use ports::{ClusterRegistry, KeyValueCache};
pub use service::GatewayService;
pub use ws::{LifecycleManager, SessionState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

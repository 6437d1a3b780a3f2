//! Adapters for the gateway.
//!
//! Infrastructure implementations of the outbound ports and the bridge to
//! the operational event bus.

pub mod event_bus;
pub mod memory;

pub use event_bus::GatewayEvents;
pub use memory::{InMemoryCache, InMemoryClusterRegistry};

//! Ports for the gateway.
//!
//! The gateway drives two external stores and implements neither; hosts
//! plug in real clients, tests use the in-memory adapters.

pub mod outbound;

pub use outbound::{ClusterRegistry, KeyValueCache};

//! # MCU Bus - Operational Event Bus
//!
//! In-process publish/subscribe channel for the control-plane gateway's
//! operational events. The gateway publishes; logging and audit consumers
//! subscribe.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Gateway    │                    │  Audit sink  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │ error | info │ ─────────┘
//!                  └──────────────┘  subscribe() / on()
//! ```
//!
//! ## Semantics
//!
//! - Two channels: `error` and `info`
//! - Publishing never blocks and applies no backpressure
//! - With no subscribers, events are dropped and nothing is stored
//! - The bus is an explicit object; several may coexist in one process

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod audit;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use audit::{
    AuditEntry, AuditError, AuditLog, AuditSink, AUDIT_PAGE_SIZE, DEFAULT_AUDIT_RETENTION,
};
pub use events::{EventChannel, EventFilter, EventKind, OperationalEvent, UnknownChannel};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

//! Inbound message handling: envelope validation, role-based routing and the
//! telemetry relay behind it.

pub mod dispatcher;
pub mod handlers;
pub mod relay;

pub use dispatcher::{Dispatcher, RoutingTable};
pub use handlers::{EnvelopeHandler, PullTelemetry, PushTelemetry};
pub use relay::TelemetryRelay;

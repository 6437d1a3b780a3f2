//! WebSocket connection handling.

pub mod handler;
pub mod session;

pub use handler::WebSocketHandler;
pub use session::{Inbound, LifecycleManager, Outbound, SessionState, TransportError};

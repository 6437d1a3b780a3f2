//! # MCU Gateway Test Suite
//!
//! End-to-end flows that run the gateway on an ephemeral port and talk to it
//! with a real WebSocket client.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs          # Gateway on 127.0.0.1:0 + client helpers
//!     ├── gateway_flows.rs    # Authentication, relay, parse errors, lifecycle
//!     └── audit_flow.rs       # Operational events recorded by the audit sink
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mcu-tests
//! ```

pub mod integration;

//! Gateway counters, exported as JSON on `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway metrics
#[derive(Default)]
pub struct GatewayMetrics {
    // Connection counters
    pub connections_accepted: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub connections_active: AtomicU64,

    // Frame counters
    pub frames_received: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub parse_failures: AtomicU64,

    // Telemetry relay counters
    pub snapshots_written: AtomicU64,
    pub snapshots_read: AtomicU64,

    pub envelopes_sent: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection that passed authentication
    pub fn record_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection rejected at connect time
    pub fn record_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an authenticated connection closing
    pub fn record_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Frame with no route for the connection's role
    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_written(&self) {
        self.snapshots_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_read(&self) {
        self.snapshots_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.envelopes_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "connections": {
                "accepted": self.connections_accepted.load(Ordering::Relaxed),
                "rejected": self.connections_rejected.load(Ordering::Relaxed),
                "active": self.connections_active.load(Ordering::Relaxed),
            },
            "frames": {
                "received": self.frames_received.load(Ordering::Relaxed),
                "dropped": self.frames_dropped.load(Ordering::Relaxed),
                "parse_failures": self.parse_failures.load(Ordering::Relaxed),
            },
            "telemetry": {
                "written": self.snapshots_written.load(Ordering::Relaxed),
                "read": self.snapshots_read.load(Ordering::Relaxed),
            },
            "envelopes_sent": self.envelopes_sent.load(Ordering::Relaxed),
        })
    }
}

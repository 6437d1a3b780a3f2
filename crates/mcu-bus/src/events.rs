//! # Operational Events
//!
//! Defines the event types that flow through the bus. Every event travels on
//! exactly one of two channels (`error` or `info`), which is the name external
//! sinks subscribe by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Channel an operational event is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventChannel {
    /// Alarm-worthy signal: parse failures from cluster nodes, disconnects,
    /// transport and server errors.
    Error,
    /// Informational signal: rejected connection attempts.
    Info,
}

impl EventChannel {
    /// Wire name of the channel.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown channel name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for EventChannel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Self::Error),
            "info" => Ok(Self::Info),
            other => Err(UnknownChannel(other.to_string())),
        }
    }
}

/// What happened. Lets consumers tell apart events sharing a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A connection failed classification or authentication.
    UnauthorizedConnection,
    /// A cluster node sent a frame that could not be handled.
    MessageParseFailure,
    /// A cluster node connection closed.
    ///
    /// Published on [`EventChannel::Error`] even though it is informational.
    ClusterDisconnected,
    /// A socket-level error on an established connection.
    TransportError,
    /// A listener-level error (bind, accept, serve).
    ServerError,
}

/// A structured operational event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalEvent {
    /// Channel the event is published on.
    pub channel: EventChannel,
    /// Event classification.
    pub kind: EventKind,
    /// Human-readable description.
    pub event: String,
    /// Payload text. Cluster-originated entries carry a JSON document here.
    pub message: String,
    /// Marks entries that originate from cluster-node protocol handling.
    #[serde(default)]
    pub inprotype: bool,
    /// When the event was raised.
    pub occurred_at: DateTime<Utc>,
}

impl OperationalEvent {
    /// Create an event on the given channel.
    pub fn new(
        channel: EventChannel,
        kind: EventKind,
        event: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            kind,
            event: event.into(),
            message: message.into(),
            inprotype: false,
            occurred_at: Utc::now(),
        }
    }

    /// Create an `error`-channel event.
    pub fn error(kind: EventKind, event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventChannel::Error, kind, event, message)
    }

    /// Create an `info`-channel event.
    pub fn info(kind: EventKind, event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventChannel::Info, kind, event, message)
    }

    /// Mark the event as originating from cluster-node protocol handling.
    #[must_use]
    pub fn in_protocol(mut self) -> Self {
        self.inprotype = true;
        self
    }

    /// Get the channel for this event (for filtering).
    #[must_use]
    pub fn channel(&self) -> EventChannel {
        self.channel
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Channels to include. Empty means all channels.
    pub channels: Vec<EventChannel>,
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific channels.
    #[must_use]
    pub fn channels(channels: Vec<EventChannel>) -> Self {
        Self {
            channels,
            kinds: Vec::new(),
        }
    }

    /// Create a filter for a single channel.
    #[must_use]
    pub fn channel(channel: EventChannel) -> Self {
        Self::channels(vec![channel])
    }

    /// Create a filter for specific event kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            channels: Vec::new(),
            kinds,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &OperationalEvent) -> bool {
        let channel_match = self.channels.is_empty() || self.channels.contains(&event.channel);
        let kind_match = self.kinds.is_empty() || self.kinds.contains(&event.kind);

        channel_match && kind_match
    }
}

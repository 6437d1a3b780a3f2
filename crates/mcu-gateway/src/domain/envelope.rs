//! The `{event, message}` wire envelope exchanged in both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Event names with a fixed meaning on the wire.
pub mod names {
    /// Telemetry push (cluster) or pull (web).
    pub const SYSTEM_INFO: &str = "systemInfo";
    /// Server to client: connection is ready for application messages.
    pub const AUTH_ONLOAD: &str = "authonload";
    /// Server to client: an inbound frame could not be handled.
    pub const ERR_MESSAGE_PARSE: &str = "ERR_MESSAGE_PARSE";
    /// Server to client: the connection was rejected at connect time.
    pub const ERR_AUTHENTICATION_FAILED: &str = "ERR_AUTHENTICATION_FAILED";
}

/// Why an inbound frame is not a valid envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope does not conform to the standard: expected a JSON object")]
    NotAnObject,

    #[error("envelope does not conform to the standard: `event` and `message` are required")]
    MissingFields,

    #[error("envelope does not conform to the standard: `event` must be a non-empty string")]
    InvalidEvent,
}

/// Wire unit. Inbound frames must carry both keys; outbound envelopes omit
/// `message` when it is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl Envelope {
    pub fn new(event: impl Into<String>, message: Value) -> Self {
        Self {
            event: event.into(),
            message: Some(message),
        }
    }

    /// Envelope with no `message` key.
    pub fn signal(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            message: None,
        }
    }

    pub fn auth_onload() -> Self {
        Self::signal(names::AUTH_ONLOAD)
    }

    pub fn system_info(snapshot: Value) -> Self {
        Self::new(names::SYSTEM_INFO, snapshot)
    }

    pub fn message_parse_error(text: impl Into<String>) -> Self {
        Self::new(names::ERR_MESSAGE_PARSE, Value::String(text.into()))
    }

    pub fn authentication_failed(text: impl Into<String>) -> Self {
        Self::new(names::ERR_AUTHENTICATION_FAILED, Value::String(text.into()))
    }

    /// Parse an inbound frame.
    ///
    /// A present `"message": null` counts as present; only a missing key
    /// is rejected.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let Value::Object(mut fields) = serde_json::from_str::<Value>(text)? else {
            return Err(EnvelopeError::NotAnObject);
        };

        let (Some(event), Some(message)) = (fields.remove("event"), fields.remove("message"))
        else {
            return Err(EnvelopeError::MissingFields);
        };

        match event {
            Value::String(event) if !event.is_empty() => Ok(Self {
                event,
                message: Some(message),
            }),
            _ => Err(EnvelopeError::InvalidEvent),
        }
    }

    /// Message payload, `null` when absent.
    pub fn message_or_null(&self) -> Value {
        self.message.clone().unwrap_or(Value::Null)
    }

    pub fn encode(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }
}

//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration
    pub server: ServerConfig,
    /// Connection path classification
    pub routes: RouteConfig,
    /// Per-connection behaviour
    pub session: SessionConfig,
    /// Credential checking
    pub auth: AuthConfig,
    /// Shared telemetry snapshot
    pub telemetry: TelemetryConfig,
    /// Event bus sizing
    pub bus: BusConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path("admin_path", &self.routes.admin_path)?;
        validate_path("cluster_path", &self.routes.cluster_path)?;

        if self.routes.admin_path == self.routes.cluster_path {
            return Err(ConfigError::InvalidRoute(
                "admin_path and cluster_path must differ".into(),
            ));
        }

        // Classification tries the admin prefix first.
        if self.routes.cluster_path.starts_with(&self.routes.admin_path) {
            return Err(ConfigError::InvalidRoute(format!(
                "cluster_path '{}' is shadowed by admin_path '{}'",
                self.routes.cluster_path, self.routes.admin_path
            )));
        }

        if self.session.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_size cannot be 0".into(),
            ));
        }

        if self.telemetry.snapshot_key.is_empty() {
            return Err(ConfigError::Invalid("snapshot_key cannot be empty".into()));
        }

        if self.bus.capacity == 0 {
            return Err(ConfigError::InvalidLimit("bus capacity cannot be 0".into()));
        }

        Ok(())
    }

    /// Get listener bind address
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

fn validate_path(name: &str, path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::InvalidRoute(format!(
            "{name} must start with '/': '{path}'"
        )));
    }
    Ok(())
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 9000, 0 = ephemeral)
    pub port: u16,
    /// Serve `GET /health` and `GET /metrics` next to the WebSocket routes
    pub expose_status: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 9000,
            expose_status: true,
        }
    }
}

/// Connection path prefixes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Administrative client prefix
    pub admin_path: String,
    /// Cluster node prefix
    pub cluster_path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            admin_path: "/socket".to_string(),
            cluster_path: "/cluster".to_string(),
        }
    }
}

/// Per-connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay between successful authentication and the `authonload` signal
    #[serde(with = "humantime_serde")]
    pub ready_delay: Duration,
    /// Max inbound frame size in bytes (default: 1MB)
    pub max_message_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ready_delay: Duration::from_secs(1),
            max_message_size: 1024 * 1024,
        }
    }
}

/// Credential checking configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Compare administrative passwords in constant time.
    ///
    /// Off by default: passwords are compared with plain equality, which
    /// leaks timing. Turning this on changes no observable result.
    pub constant_time_compare: bool,
}

/// Shared telemetry snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Cache key holding the snapshot
    pub snapshot_key: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            snapshot_key: "systemInfo".to_string(),
        }
    }
}

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Events buffered per subscriber before it lags
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: mcu_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid connection path
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}

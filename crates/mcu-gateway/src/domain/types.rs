//! Core domain types: roles, peer addresses, credentials and the
//! authentication result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Role assigned to an authenticated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Worker node, authenticated by source address. Pushes telemetry.
    Cluster,
    /// Administrative client, authenticated by username/password. Pulls telemetry.
    Web,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cluster => "cluster",
            Role::Web => "web",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address family of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFamily {
    IPv4,
    IPv6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::IPv4 => f.write_str("IPv4"),
            AddressFamily::IPv6 => f.write_str("IPv6"),
        }
    }
}

/// Network address metadata of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddress {
    /// Textual IP address. IPv4-mapped IPv6 addresses are reported as IPv4.
    pub address: String,
    pub family: AddressFamily,
    pub port: u16,
}

impl PeerAddress {
    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        let ip = addr.ip().to_canonical();
        let family = match ip {
            IpAddr::V4(_) => AddressFamily::IPv4,
            IpAddr::V6(_) => AddressFamily::IPv6,
        };
        Self {
            address: ip.to_string(),
            family,
            port: addr.port(),
        }
    }

    /// Address metadata in the shape carried by operational events.
    pub fn metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("remoteAddress".into(), self.address.clone().into());
        map.insert("remoteFamily".into(), self.family.to_string().into());
        map.insert("remotePort".into(), self.port.into());
        map
    }
}

impl From<SocketAddr> for PeerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::from_socket_addr(addr)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            AddressFamily::IPv4 => write!(f, "{}:{}", self.address, self.port),
            AddressFamily::IPv6 => write!(f, "[{}]:{}", self.address, self.port),
        }
    }
}

/// Registration record of a worker node, as held by the document store.
///
/// Only the address is interpreted; every other field is carried through
/// untouched as part of the identity token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    #[serde(rename = "remoteAddress")]
    pub remote_address: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ClusterRecord {
    pub fn new(remote_address: impl Into<String>) -> Self {
        Self {
            remote_address: remote_address.into(),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Administrative credential, stored in the cache under the username.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredential {
    pub username: String,
    #[serde(rename = "DecryptKey")]
    pub decrypt_key: String,
}

impl AdminCredential {
    pub fn new(username: impl Into<String>, decrypt_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            decrypt_key: decrypt_key.into(),
        }
    }
}

// Keep the key out of logs.
impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredential")
            .field("username", &self.username)
            .field("decrypt_key", &"<redacted>")
            .finish()
    }
}

/// Resolved identity of an authenticated connection.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityToken {
    Cluster(ClusterRecord),
    Web(AdminCredential),
}

/// Outcome of a successful authentication. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResult {
    role: Role,
    token: IdentityToken,
    peer: PeerAddress,
}

impl AuthResult {
    pub fn cluster(record: ClusterRecord, peer: PeerAddress) -> Self {
        Self {
            role: Role::Cluster,
            token: IdentityToken::Cluster(record),
            peer,
        }
    }

    pub fn web(credential: AdminCredential, peer: PeerAddress) -> Self {
        Self {
            role: Role::Web,
            token: IdentityToken::Web(credential),
            peer,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn token(&self) -> &IdentityToken {
        &self.token
    }

    pub fn peer(&self) -> &PeerAddress {
        &self.peer
    }
}

//! Connection-time authentication.
//!
//! Classifies a connection by its request path, then verifies it against the
//! store that backs the chosen role. Runs exactly once per connection.

use super::cookie::CookieJar;
use crate::domain::config::{AuthConfig, RouteConfig};
use crate::domain::{AdminCredential, AuthError, AuthResult, PeerAddress, Role};
use crate::ports::{ClusterRegistry, KeyValueCache};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// What the authenticator sees of an incoming connection.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    /// Request path including any query string.
    pub path: String,
    /// Raw `Cookie` header.
    pub cookie: Option<String>,
    pub peer: PeerAddress,
}

impl ConnectionRequest {
    pub fn new(path: impl Into<String>, peer: PeerAddress) -> Self {
        Self {
            path: path.into(),
            cookie: None,
            peer,
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

/// Resolves a connection to an [`AuthResult`] or rejects it.
pub struct Authenticator {
    routes: RouteConfig,
    constant_time: bool,
    cache: Arc<dyn KeyValueCache>,
    registry: Arc<dyn ClusterRegistry>,
}

impl Authenticator {
    pub fn new(
        routes: RouteConfig,
        auth: &AuthConfig,
        cache: Arc<dyn KeyValueCache>,
        registry: Arc<dyn ClusterRegistry>,
    ) -> Self {
        Self {
            routes,
            constant_time: auth.constant_time_compare,
            cache,
            registry,
        }
    }

    /// Role implied by the request path. The admin prefix is tried first.
    pub fn classify(&self, path: &str) -> Result<Role, AuthError> {
        if path.starts_with(&self.routes.admin_path) {
            Ok(Role::Web)
        } else if path.starts_with(&self.routes.cluster_path) {
            Ok(Role::Cluster)
        } else {
            Err(AuthError::AccessNotPermitted)
        }
    }

    pub async fn authenticate(&self, request: &ConnectionRequest) -> Result<AuthResult, AuthError> {
        let role = self.classify(&request.path)?;
        debug!(peer = %request.peer, role = %role, "Authenticating connection");

        match role {
            Role::Web => self.authenticate_web(request).await,
            Role::Cluster => self.authenticate_cluster(request).await,
        }
    }

    async fn authenticate_web(&self, request: &ConnectionRequest) -> Result<AuthResult, AuthError> {
        let jar = request
            .cookie
            .as_deref()
            .map(CookieJar::parse)
            .unwrap_or_default();

        if !jar.contains("password") || !jar.contains("username") {
            return Err(AuthError::MissingToken);
        }
        let (Some(username), Some(password)) = (jar.get_single("username"), jar.get_single("password"))
        else {
            // Repeated cookie names never match a stored credential.
            return Err(AuthError::Rejected);
        };

        let raw = self
            .cache
            .get(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let stored = decode_credential(&raw)?;

        let username_matches = stored.username == username;
        let key_matches = if self.constant_time {
            constant_time_compare(password, &stored.decrypt_key)
        } else {
            password == stored.decrypt_key
        };

        if username_matches && key_matches {
            Ok(AuthResult::web(stored, request.peer.clone()))
        } else {
            Err(AuthError::Rejected)
        }
    }

    async fn authenticate_cluster(
        &self,
        request: &ConnectionRequest,
    ) -> Result<AuthResult, AuthError> {
        let record = self
            .registry
            .find_one_by_address(&request.peer.address)
            .await?
            .ok_or(AuthError::Rejected)?;
        Ok(AuthResult::cluster(record, request.peer.clone()))
    }
}

/// Decode a cache entry into a credential.
///
/// Invalid JSON is malformed, a stored `null` counts as absent, and any
/// other shape without string `username`/`DecryptKey` fields is a mismatch.
fn decode_credential(raw: &str) -> Result<AdminCredential, AuthError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| AuthError::MalformedCredential(e.to_string()))?;
    if value.is_null() {
        return Err(AuthError::UserNotFound);
    }

    match (
        value.get("username").and_then(Value::as_str),
        value.get("DecryptKey").and_then(Value::as_str),
    ) {
        (Some(username), Some(key)) => Ok(AdminCredential::new(username, key)),
        _ => Err(AuthError::Rejected),
    }
}

/// Constant-time string comparison.
///
/// Takes the same time regardless of how many characters match. Lengths are
/// compared in constant time too; the shorter input is padded with a byte
/// that differs between the two sides.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}

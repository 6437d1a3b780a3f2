//! In-memory store adapters.
//!
//! Production deployments back the ports with the real cache and document
//! store; these implementations serve tests and single-process setups.

use crate::domain::{AdminCredential, ClusterRecord, StoreError};
use crate::ports::{ClusterRegistry, KeyValueCache};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory key-value cache.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an administrative credential under its username.
    pub fn insert_credential(&self, credential: &AdminCredential) -> Result<(), StoreError> {
        let value = serde_json::to_string(credential)
            .map_err(|e| StoreError::Operation(e.to_string()))?;
        self.entries
            .write()
            .insert(credential.username.clone(), value);
        Ok(())
    }

    /// Raw value for a key, bypassing the async port.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// In-memory registry of cluster nodes, keyed by address.
#[derive(Default)]
pub struct InMemoryClusterRegistry {
    records: RwLock<HashMap<String, ClusterRecord>>,
}

impl InMemoryClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a node.
    pub fn register(&self, record: ClusterRecord) {
        self.records
            .write()
            .insert(record.remote_address.clone(), record);
    }

    /// Remove a node. Returns whether it was registered.
    pub fn deregister(&self, address: &str) -> bool {
        self.records.write().remove(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ClusterRegistry for InMemoryClusterRegistry {
    async fn find_one_by_address(
        &self,
        address: &str,
    ) -> Result<Option<ClusterRecord>, StoreError> {
        Ok(self.records.read().get(address).cloned())
    }
}

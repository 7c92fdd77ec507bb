use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::provider::{AccountDataError, AccountDataStore};

/// In-memory account data store
///
/// Clones share the same records. The store can be switched offline to
///  simulate an unreachable server.
#[derive(Debug, Clone)]
pub struct MemoryAccountDataStore {
    inner: Arc<RwLock<MemoryAccountDataStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryAccountDataStoreInner {
    /// event type -> record
    records: BTreeMap<String, Value>,
    offline: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryAccountDataStoreError {
    #[error("memory provider error: {0}")]
    Internal(String),
    #[error("account data store is offline")]
    Offline,
}

impl MemoryAccountDataStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryAccountDataStoreInner::default())),
        }
    }

    /// Make every subsequent call fail with `Offline` until switched back
    pub fn set_offline(&self, offline: bool) -> Result<(), MemoryAccountDataStoreError> {
        let mut inner = self.inner.write().map_err(|e| {
            MemoryAccountDataStoreError::Internal(format!("failed to acquire write lock: {}", e))
        })?;
        inner.offline = offline;
        Ok(())
    }
}

impl Default for MemoryAccountDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountDataStore for MemoryAccountDataStore {
    type Error = MemoryAccountDataStoreError;

    async fn get(&self, event_type: &str) -> Result<Option<Value>, AccountDataError<Self::Error>> {
        let inner = self.inner.read().map_err(|e| {
            AccountDataError::Provider(MemoryAccountDataStoreError::Internal(format!(
                "failed to acquire read lock: {}",
                e
            )))
        })?;
        if inner.offline {
            return Err(MemoryAccountDataStoreError::Offline.into());
        }

        Ok(inner.records.get(event_type).cloned())
    }

    async fn put(
        &self,
        event_type: &str,
        content: Value,
    ) -> Result<(), AccountDataError<Self::Error>> {
        let mut inner = self.inner.write().map_err(|e| {
            AccountDataError::Provider(MemoryAccountDataStoreError::Internal(format!(
                "failed to acquire write lock: {}",
                e
            )))
        })?;
        if inner.offline {
            return Err(MemoryAccountDataStoreError::Offline.into());
        }

        inner.records.insert(event_type.to_string(), content);
        Ok(())
    }

    async fn event_types(&self) -> Result<Vec<String>, AccountDataError<Self::Error>> {
        let inner = self.inner.read().map_err(|e| {
            AccountDataError::Provider(MemoryAccountDataStoreError::Internal(format!(
                "failed to acquire read lock: {}",
                e
            )))
        })?;
        if inner.offline {
            return Err(MemoryAccountDataStoreError::Offline.into());
        }

        Ok(inner.records.keys().cloned().collect())
    }
}

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountDataError<T> {
    /// The backing store failed (offline, io, lock poisoned ...)
    #[error("unhandled account data provider error: {0}")]
    Provider(#[from] T),
}

/// Per-account key/value store of JSON records, addressed by event type
///
/// Secret storage persists everything through this trait: one record per key
///  (`m.secret_storage.key.<id>`), one default key pointer and one record per
///  secret name. Implementations own durability and any cross-device ordering.
#[async_trait]
pub trait AccountDataStore: Send + Sync + Debug + Clone + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the record stored under `event_type`
    ///
    /// # Returns
    /// * `Ok(Some(value))` - The stored record
    /// * `Ok(None)` - Nothing has been stored under this type
    /// * `Err(AccountDataError)` - The store could not be reached
    async fn get(&self, event_type: &str) -> Result<Option<Value>, AccountDataError<Self::Error>>;

    /// Replace the record stored under `event_type`
    async fn put(&self, event_type: &str, content: Value)
        -> Result<(), AccountDataError<Self::Error>>;

    /// List every event type that currently has a record
    async fn event_types(&self) -> Result<Vec<String>, AccountDataError<Self::Error>>;
}

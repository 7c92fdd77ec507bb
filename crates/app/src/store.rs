use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use common::account_data::{AccountDataError, AccountDataStore};
use parking_lot::Mutex;
use serde_json::Value;

/// Account data kept in a single JSON file: `{ <event type>: <record> }`
///
/// Every write rewrites the file through a temporary sibling and a rename, so
///  a crash leaves either the old or the new contents. Writers within this
///  process are serialised; separate processes are last-writer-wins.
#[derive(Debug, Clone)]
pub struct FileAccountDataStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, thiserror::Error)]
pub enum FileAccountDataStoreError {
    #[error("io error on {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("account data file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("account data worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

type Records = BTreeMap<String, Value>;

impl FileAccountDataStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn read_records(&self) -> Result<Records, FileAccountDataStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Records::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Records::new()),
            Err(e) => Err(FileAccountDataStoreError::Io(self.path.clone(), e)),
        }
    }

    fn write_records(&self, records: &Records) -> Result<(), FileAccountDataStoreError> {
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(records)?;
        fs::write(&tmp, bytes).map_err(|e| FileAccountDataStoreError::Io(tmp.clone(), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| FileAccountDataStoreError::Io(self.path.clone(), e))?;
        Ok(())
    }

    /// Run `f` under the file lock on the blocking pool
    async fn with_records<T, F>(&self, f: F) -> Result<T, FileAccountDataStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Self) -> Result<T, FileAccountDataStoreError> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = this.lock.lock();
            f(&this)
        })
        .await?
    }
}

#[async_trait]
impl AccountDataStore for FileAccountDataStore {
    type Error = FileAccountDataStoreError;

    async fn get(&self, event_type: &str) -> Result<Option<Value>, AccountDataError<Self::Error>> {
        let event_type = event_type.to_string();
        let value = self
            .with_records(move |store| Ok(store.read_records()?.remove(&event_type)))
            .await?;
        Ok(value)
    }

    async fn put(
        &self,
        event_type: &str,
        content: Value,
    ) -> Result<(), AccountDataError<Self::Error>> {
        let key = event_type.to_string();
        self.with_records(move |store| {
            let mut records = store.read_records()?;
            records.insert(key, content);
            store.write_records(&records)
        })
        .await?;
        tracing::debug!("wrote {} to {}", event_type, self.path.display());
        Ok(())
    }

    async fn event_types(&self) -> Result<Vec<String>, AccountDataError<Self::Error>> {
        let event_types = self
            .with_records(|store| Ok(store.read_records()?.into_keys().collect()))
            .await?;
        Ok(event_types)
    }
}

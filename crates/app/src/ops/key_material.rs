use std::sync::Arc;

use clap::Args;
use common::account_data::AccountDataStore;
use common::crypto::{KeySpec, KeySpecError, ProgressListener};
use common::storage::{SecretStorage, SecretStorageError};
use tokio_util::sync::CancellationToken;

/// How the user supplies a key's raw material
#[derive(Args, Debug, Clone, Default)]
pub struct KeyMaterial {
    /// Recovery key, with or without spaces
    #[arg(long, conflicts_with = "passphrase")]
    pub recovery_key: Option<String>,

    /// Passphrase of a passphrase-backed key
    #[arg(long)]
    pub passphrase: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyMaterialError {
    #[error("either --recovery-key or --passphrase is required")]
    Missing,
    #[error("invalid recovery key: {0}")]
    RecoveryKey(#[from] KeySpecError),
    #[error(transparent)]
    Storage(#[from] SecretStorageError),
}

impl KeyMaterial {
    /// Turn the supplied recovery key or passphrase into key material for
    ///  `key_id` (or the default key)
    pub async fn resolve<S: AccountDataStore>(
        &self,
        storage: &SecretStorage<S>,
        key_id: Option<&str>,
    ) -> Result<KeySpec, KeyMaterialError> {
        if let Some(recovery_key) = &self.recovery_key {
            return Ok(KeySpec::from_recovery_key(recovery_key)?);
        }
        let Some(passphrase) = &self.passphrase else {
            return Err(KeyMaterialError::Missing);
        };

        let key_id = match key_id {
            Some(key_id) => key_id.to_string(),
            None => storage.get_default_key().await?.key_id().to_string(),
        };
        let key_spec = storage
            .key_spec_from_passphrase(
                &key_id,
                passphrase,
                Some(progress_logger()),
                Some(cancel_on_interrupt()),
            )
            .await?;
        Ok(key_spec)
    }
}

/// Trace derivation progress
pub fn progress_logger() -> Arc<dyn ProgressListener> {
    Arc::new(|progress: u32, total: u32| {
        tracing::trace!("key derivation {}/{}", progress, total);
        if progress == total {
            tracing::debug!("key derivation finished after {} iterations", total);
        }
    })
}

/// A token that fires when the user hits ctrl-c
pub fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling key derivation");
            trigger.cancel();
        }
    });
    token
}

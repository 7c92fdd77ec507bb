use clap::Args;
use common::storage::KeyCreationInfo;
use common::trust::KeySigner;
use uuid::Uuid;

use super::KeyOpError;
use crate::ops::key_material::{cancel_on_interrupt, progress_logger};

#[derive(Args, Debug, Clone)]
pub struct Generate {
    /// Key id (defaults to a random uuid)
    #[arg(long)]
    pub key_id: Option<String>,

    /// Human readable key name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Derive the key from this passphrase instead of generating it randomly
    #[arg(long)]
    pub passphrase: Option<String>,

    /// Publish the key without signing it (random keys only)
    #[arg(long, conflicts_with = "passphrase")]
    pub unsigned: bool,

    /// Make the new key the default key
    #[arg(long)]
    pub default: bool,
}

#[async_trait::async_trait]
impl crate::op::Op for Generate {
    type Error = KeyOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, storage) = ctx.storage()?;
        let signer = state.signer()?;
        let key_id = self
            .key_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let created: KeyCreationInfo = match &self.passphrase {
            Some(passphrase) => {
                storage
                    .generate_key_with_passphrase(
                        &key_id,
                        &self.name,
                        passphrase,
                        &signer,
                        Some(progress_logger()),
                        Some(cancel_on_interrupt()),
                    )
                    .await?
            }
            None => {
                let signer = (!self.unsigned).then_some(&signer as &dyn KeySigner);
                storage.generate_key(&key_id, &self.name, signer).await?
            }
        };

        if self.default {
            storage.set_default_key(&created.key_id).await?;
        }

        Ok(format!(
            "Generated key {}{}\nRecovery key: {}",
            created.key_id,
            if self.default { " (default)" } else { "" },
            created.recovery_key.as_str()
        ))
    }
}

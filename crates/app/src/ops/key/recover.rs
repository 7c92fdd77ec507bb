use clap::Args;

use super::KeyOpError;
use crate::ops::key_material::KeyMaterial;

/// Check key material against a key, and print its recovery key
#[derive(Args, Debug, Clone)]
pub struct Recover {
    /// Key id (defaults to the default key)
    #[arg(long)]
    pub key_id: Option<String>,

    #[command(flatten)]
    pub material: KeyMaterial,
}

#[async_trait::async_trait]
impl crate::op::Op for Recover {
    type Error = KeyOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, storage) = ctx.storage()?;
        let key_id = match &self.key_id {
            Some(key_id) => key_id.clone(),
            None => storage.get_default_key().await?.key_id().to_string(),
        };

        let key_spec = self.material.resolve(&storage, Some(&key_id)).await?;
        if !storage.check_key(&key_id, &key_spec).await? {
            return Err(common::storage::SecretStorageError::AuthenticationFailure.into());
        }

        Ok(format!(
            "Key material matches {}\nRecovery key: {}",
            key_id,
            key_spec.to_recovery_key()
        ))
    }
}

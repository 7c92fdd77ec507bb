use clap::Args;
use common::storage::KeyRef;

use super::SecretOpError;
use crate::ops::key_material::KeyMaterial;

#[derive(Args, Debug, Clone)]
pub struct Store {
    /// Secret name, e.g. m.cross_signing.master
    pub name: String,

    /// Plaintext to encrypt
    #[arg(long)]
    pub value: String,

    /// Key to encrypt for (defaults to the default key)
    #[arg(long)]
    pub key_id: Option<String>,

    #[command(flatten)]
    pub material: KeyMaterial,
}

#[async_trait::async_trait]
impl crate::op::Op for Store {
    type Error = SecretOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, storage) = ctx.storage()?;
        let key_spec = self
            .material
            .resolve(&storage, self.key_id.as_deref())
            .await?;

        let key_ref = match &self.key_id {
            Some(key_id) => KeyRef::new(key_id.clone(), key_spec),
            None => KeyRef::default_key(key_spec),
        };
        storage
            .store_secret(&self.name, self.value.as_bytes(), &[key_ref])
            .await?;

        Ok(format!(
            "Stored {} for key {}",
            self.name,
            self.key_id.as_deref().unwrap_or("<default>")
        ))
    }
}

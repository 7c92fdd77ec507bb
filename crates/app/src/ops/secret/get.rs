use clap::Args;

use super::SecretOpError;
use crate::ops::key_material::KeyMaterial;

#[derive(Args, Debug, Clone)]
pub struct Get {
    pub name: String,

    /// Key to decrypt with (defaults to the default key)
    #[arg(long)]
    pub key_id: Option<String>,

    #[command(flatten)]
    pub material: KeyMaterial,
}

#[async_trait::async_trait]
impl crate::op::Op for Get {
    type Error = SecretOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, storage) = ctx.storage()?;
        let key_spec = self
            .material
            .resolve(&storage, self.key_id.as_deref())
            .await?;

        let secret = storage
            .get_secret(&self.name, self.key_id.as_deref(), &key_spec)
            .await?;
        Ok(String::from_utf8_lossy(&secret).into_owned())
    }
}

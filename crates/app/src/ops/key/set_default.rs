use clap::Args;

use super::KeyOpError;

#[derive(Args, Debug, Clone)]
pub struct SetDefault {
    pub key_id: String,
}

#[async_trait::async_trait]
impl crate::op::Op for SetDefault {
    type Error = KeyOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, storage) = ctx.storage()?;
        storage.set_default_key(&self.key_id).await?;
        Ok(format!("Default key set to {}", self.key_id))
    }
}

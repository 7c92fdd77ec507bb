use clap::Args;
use common::storage::KeyInfoResult;

use super::KeyOpError;

#[derive(Args, Debug, Clone)]
pub struct Show {
    /// Key id (defaults to the default key)
    pub key_id: Option<String>,
}

#[async_trait::async_trait]
impl crate::op::Op for Show {
    type Error = KeyOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, storage) = ctx.storage()?;
        let result = match &self.key_id {
            Some(key_id) => storage.get_key(key_id).await?,
            None => storage.get_default_key().await?,
        };

        let (info, supported) = match result {
            KeyInfoResult::Found(info) => (info, true),
            KeyInfoResult::UnknownAlgorithm(info) => (info, false),
            KeyInfoResult::NotFound(id) => return Err(KeyOpError::NotFound(id)),
        };
        let trusted = storage.is_key_trusted(&info.id).await?;
        let content = serde_json::to_string_pretty(&info.content)
            .unwrap_or_else(|e| format!("<unprintable: {}>", e));

        Ok(format!(
            "Key {}\nsupported: {}\ntrusted: {}\n{}",
            info.id, supported, trusted, content
        ))
    }
}

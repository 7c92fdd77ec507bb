use clap::Args;
use common::storage::{KeyInfoResult, SecretStorageError};

use super::KeyOpError;

#[derive(Args, Debug, Clone)]
pub struct List;

#[async_trait::async_trait]
impl crate::op::Op for List {
    type Error = KeyOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, storage) = ctx.storage()?;
        let default = match storage.get_default_key().await {
            Ok(result) => Some(result.key_id().to_string()),
            Err(SecretStorageError::NoDefaultKey) => None,
            Err(e) => return Err(e.into()),
        };

        let key_ids = storage.key_ids().await?;
        if key_ids.is_empty() {
            return Ok("No keys found".to_string());
        }

        let mut lines = Vec::with_capacity(key_ids.len());
        for key_id in key_ids {
            let marker = if default.as_deref() == Some(key_id.as_str()) {
                " (default)"
            } else {
                ""
            };
            let line = match storage.get_key(&key_id).await? {
                KeyInfoResult::Found(info) => {
                    let trusted = storage.is_key_trusted(&key_id).await?;
                    format!(
                        "{}{} name: {:?} passphrase: {} trusted: {}",
                        key_id,
                        marker,
                        info.content.name,
                        info.is_passphrase_based(),
                        trusted
                    )
                }
                KeyInfoResult::UnknownAlgorithm(info) => format!(
                    "{}{} unsupported algorithm {}",
                    key_id, marker, info.content.algorithm
                ),
                KeyInfoResult::NotFound(_) => continue,
            };
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

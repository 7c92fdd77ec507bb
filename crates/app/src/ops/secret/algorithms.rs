use clap::Args;
use common::storage::KeyInfoResult;

use super::SecretOpError;

/// List the keys a secret is encrypted for
#[derive(Args, Debug, Clone)]
pub struct Algorithms {
    pub name: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Algorithms {
    type Error = SecretOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, storage) = ctx.storage()?;
        let results = storage.get_algorithms_for_secret(&self.name).await?;
        if results.is_empty() {
            return Ok(format!("{} is not stored", self.name));
        }

        let lines: Vec<String> = results
            .iter()
            .map(|result| match result {
                KeyInfoResult::Found(info) => {
                    format!("{}\t{}", info.id, info.content.algorithm)
                }
                KeyInfoResult::UnknownAlgorithm(info) => {
                    format!("{}\t{} (unsupported)", info.id, info.content.algorithm)
                }
                KeyInfoResult::NotFound(key_id) => format!("{}\t<missing key>", key_id),
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

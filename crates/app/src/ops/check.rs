use clap::Args;
use common::storage::{IntegrityFailure, IntegrityResult, MissingReason, SecretStorageError};

/// Check that secrets are readable with a key, and that the key is trusted
#[derive(Args, Debug, Clone)]
pub struct Check {
    /// Secret names to check
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Key to check against (defaults to the default key)
    #[arg(long)]
    pub key_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error(transparent)]
    Storage(#[from] SecretStorageError),
    /// The check ran, and found problems
    #[error("{}", describe_failure(.0))]
    Failed(IntegrityFailure),
}

#[async_trait::async_trait]
impl crate::op::Op for Check {
    type Error = CheckError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, storage) = ctx.storage()?;
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        let result = storage
            .check_should_be_able_to_access_secrets(&names, self.key_id.as_deref())
            .await?;

        match result {
            IntegrityResult::Success { passphrase_based } => Ok(format!(
                "OK: all {} secret(s) accessible{}",
                names.len(),
                if passphrase_based {
                    " (passphrase key)"
                } else {
                    ""
                }
            )),
            IntegrityResult::Failure(failure) => Err(CheckError::Failed(failure)),
        }
    }
}

fn describe_failure(failure: &IntegrityFailure) -> String {
    let mut lines = vec![format!("integrity check failed for key {}", failure.key_id)];
    if !failure.key_trusted {
        lines.push("  key is not trusted".to_string());
    }
    for missing in &failure.missing {
        let reason = match missing.reason {
            MissingReason::UnknownSecret => "not stored",
            MissingReason::NotEncryptedWithKey => "not encrypted for this key",
        };
        lines.push(format!("  {}: {}", missing.name, reason));
    }
    lines.join("\n")
}

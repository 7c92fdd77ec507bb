use clap::Args;

use common::crypto::DEFAULT_ITERATIONS;
use common::trust::ed25519_key_id;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// User id this device signs new keys as
    #[arg(long, default_value = "@user:localhost")]
    pub user_id: String,

    /// PBKDF2 iterations for new passphrase keys
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub pbkdf2_iterations: u32,

    /// Valid signatures a key needs before it is trusted (0 disables the check)
    #[arg(long, default_value_t = 1)]
    pub required_signatures: usize,

    /// Default log level (overridable with RUST_LOG)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            user_id: self.user_id.clone(),
            pbkdf2_iterations: self.pbkdf2_iterations,
            required_signatures: self.required_signatures,
            trusted_keys: Vec::new(),
            log_level: self.log_level.clone(),
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let public_key = state.load_key()?.public();

        let output = format!(
            "Initialized ssss directory at: {}\n\
             - Key: {}\n\
             - Account data: {}\n\
             - Config: {}\n\
             - User id: {}\n\
             - Signing key: {}",
            state.ssss_dir.display(),
            state.key_path.display(),
            state.account_data_path.display(),
            state.config_path.display(),
            state.config.user_id,
            ed25519_key_id(&public_key),
        );

        Ok(output)
    }
}

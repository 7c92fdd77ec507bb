use std::sync::Arc;
use std::{fs, path::PathBuf};

use common::crypto::{PublicKey, SecretKey, DEFAULT_ITERATIONS};
use common::storage::{SecretStorage, SecretStorageConfig};
use common::trust::{Ed25519Signer, Ed25519TrustOracle, TrustPolicy};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

use crate::store::FileAccountDataStore;

pub const APP_NAME: &str = "ssss";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "key.pem";
pub const ACCOUNT_DATA_FILE_NAME: &str = "account_data.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Identity this device signs key metadata as
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// PBKDF2 rounds for new passphrase keys
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
    /// Valid signatures a key needs to be trusted (0 disables the check)
    #[serde(default = "default_required_signatures")]
    pub required_signatures: usize,
    /// Base64 Ed25519 keys of other devices trusted to sign as `user_id`
    #[serde(default)]
    pub trusted_keys: Vec<String>,
    /// Default log level, overridable with RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_user_id() -> String {
    "@user:localhost".to_string()
}

fn default_pbkdf2_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_required_signatures() -> usize {
    1
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            required_signatures: default_required_signatures(),
            trusted_keys: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// The configured log level, falling back to `warn` if it does not parse
    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::WARN)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.ssss)
    pub ssss_dir: PathBuf,
    /// Path to the signing key PEM file
    pub key_path: PathBuf,
    /// Path to the account data file
    pub account_data_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.ssss)
    pub fn ssss_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory with a fresh signing key
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let ssss_dir = Self::ssss_dir(custom_path)?;

        if ssss_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&ssss_dir)?;

        let key = SecretKey::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        let key_path = ssss_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, key.to_pem())?;
        restrict_permissions(&key_path)?;

        let config = config.unwrap_or_default();
        let config_path = ssss_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        let account_data_path = ssss_dir.join(ACCOUNT_DATA_FILE_NAME);
        fs::write(&account_data_path, "{}")?;

        Ok(Self {
            ssss_dir,
            key_path,
            account_data_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let ssss_dir = Self::ssss_dir(custom_path)?;

        if !ssss_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = ssss_dir.join(KEY_FILE_NAME);
        let account_data_path = ssss_dir.join(ACCOUNT_DATA_FILE_NAME);
        let config_path = ssss_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            ssss_dir,
            key_path,
            account_data_path,
            config_path,
            config,
        })
    }

    /// Load the signing key from the key file
    pub fn load_key(&self) -> Result<SecretKey, StateError> {
        let pem = fs::read_to_string(&self.key_path)?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Ok(key)
    }

    pub fn signer(&self) -> Result<Ed25519Signer, StateError> {
        Ok(Ed25519Signer::new(
            self.config.user_id.clone(),
            self.load_key()?,
        ))
    }

    /// Trust our own key plus every configured device key
    pub fn trust_oracle(&self) -> Result<Ed25519TrustOracle, StateError> {
        let mut oracle =
            Ed25519TrustOracle::new().with_trusted_key(&self.config.user_id, self.load_key()?.public());
        for encoded in &self.config.trusted_keys {
            let key = PublicKey::from_base64(encoded)
                .map_err(|e| StateError::InvalidKey(format!("{}: {}", encoded, e)))?;
            oracle.trust(&self.config.user_id, key);
        }
        Ok(oracle)
    }

    pub fn storage(&self) -> Result<SecretStorage<FileAccountDataStore>, StateError> {
        let store = FileAccountDataStore::new(&self.account_data_path);
        let config = SecretStorageConfig {
            pbkdf2_iterations: self.config.pbkdf2_iterations,
            trust_policy: TrustPolicy::require(self.config.required_signatures),
        };
        Ok(SecretStorage::new(store, Arc::new(self.trust_oracle()?)).with_config(config))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> Result<(), StateError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> Result<(), StateError> {
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("ssss directory not initialized. Run 'ssss init' first")]
    NotInitialized,

    #[error("ssss directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

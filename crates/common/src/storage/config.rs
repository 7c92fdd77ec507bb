use crate::crypto::DEFAULT_ITERATIONS;
use crate::trust::TrustPolicy;

/// Tunables for a [`SecretStorage`](super::SecretStorage) instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretStorageConfig {
    /// PBKDF2 rounds used for newly created passphrase keys
    pub pbkdf2_iterations: u32,
    /// Signatures a key needs before it is considered trusted
    pub trust_policy: TrustPolicy,
}

impl Default for SecretStorageConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_ITERATIONS,
            trust_policy: TrustPolicy::default(),
        }
    }
}

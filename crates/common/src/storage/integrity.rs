/// Why a secret cannot be read with the checked key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// No record exists for the secret at all
    UnknownSecret,
    /// The secret exists, but not encrypted for the checked key
    NotEncryptedWithKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSecret {
    pub name: String,
    pub reason: MissingReason,
}

/// Every problem found for a `(secret names, key)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityFailure {
    pub key_id: String,
    pub missing: Vec<MissingSecret>,
    pub key_trusted: bool,
}

/// Verdict of [`check_should_be_able_to_access_secrets`](super::SecretStorage::check_should_be_able_to_access_secrets)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityResult {
    /// Every secret is present under a trusted key
    Success {
        /// Whether the key can be re-derived from a passphrase, so callers
        ///  know which prompt to show
        passphrase_based: bool,
    },
    Failure(IntegrityFailure),
}

impl IntegrityResult {
    pub fn is_success(&self) -> bool {
        matches!(self, IntegrityResult::Success { .. })
    }
}

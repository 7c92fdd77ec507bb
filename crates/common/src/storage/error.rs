use crate::account_data::AccountDataError;
use crate::crypto::{CipherError, DerivationError, KeySpecError};

/// Errors returned by [`SecretStorage`](super::SecretStorage)
///
/// Cryptographic failures are terminal; only `CollaboratorUnavailable` is
///  worth retrying, and that is left to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SecretStorageError {
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("key already exists: {0}")]
    KeyAlreadyExists(String),
    #[error("key {key_id} uses unsupported algorithm {algorithm}")]
    UnknownAlgorithm { key_id: String, algorithm: String },
    #[error("no default key is configured")]
    NoDefaultKey,
    #[error("secret {name} is not stored under key {key_id}")]
    SecretNotFound { name: String, key_id: String },
    /// Wrong key or corrupted ciphertext
    #[error("authentication failed")]
    AuthenticationFailure,
    #[error("key is not trusted: {0}")]
    KeyUntrusted(String),
    #[error("key derivation was cancelled")]
    DerivationCancelled,
    /// A `KeyRef` was given without key material
    #[error("no key material supplied for key {0}")]
    MissingKeySpec(String),
    #[error("key {0} is not derived from a passphrase")]
    NoPassphrase(String),
    /// The secret name collides with a key or default key record
    #[error("{0} is reserved for key metadata")]
    ReservedName(String),
    #[error("malformed {event_type} record: {reason}")]
    MalformedRecord { event_type: String, reason: String },
    #[error("account data unavailable: {0}")]
    CollaboratorUnavailable(anyhow::Error),
    #[error("cipher error: {0}")]
    Cipher(#[source] CipherError),
    #[error("invalid key material: {0}")]
    KeySpec(#[from] KeySpecError),
    #[error("key derivation failed: {0}")]
    Derivation(#[source] DerivationError),
}

impl<T> From<AccountDataError<T>> for SecretStorageError
where
    T: std::error::Error + Send + Sync + 'static,
{
    fn from(e: AccountDataError<T>) -> Self {
        SecretStorageError::CollaboratorUnavailable(anyhow::Error::new(e))
    }
}

impl From<CipherError> for SecretStorageError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::AuthenticationFailure => SecretStorageError::AuthenticationFailure,
            other => SecretStorageError::Cipher(other),
        }
    }
}

impl From<DerivationError> for SecretStorageError {
    fn from(e: DerivationError) -> Self {
        match e {
            DerivationError::Cancelled => SecretStorageError::DerivationCancelled,
            other => SecretStorageError::Derivation(other),
        }
    }
}

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::aes_hmac::SSSS_ALGORITHM_AES_HMAC_SHA2;
use super::random::{RandomError, RandomSource};
use super::recovery_key::{decode_recovery_key, encode_recovery_key, RecoveryKeyError};

/// Size of a secret storage key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Errors that can occur while constructing a [`KeySpec`]
#[derive(Debug, thiserror::Error)]
pub enum KeySpecError {
    #[error("invalid key size, expected {KEY_SIZE}, got {0}")]
    InvalidLength(usize),
    #[error("recovery key error: {0}")]
    RecoveryKey(#[from] RecoveryKeyError),
    #[error("random error: {0}")]
    Random(#[from] RandomError),
}

/// Raw secret storage key material
///
/// A `KeySpec` is the only form in which a storage key exists in the clear. It is
/// produced by random generation, passphrase derivation or by decoding a
/// recovery key, handed to a single encrypt/decrypt call, and scrubbed when it is
/// dropped. It deliberately has no serde implementation: only
/// [`KeyInfoContent`](crate::storage::KeyInfoContent) crosses the persistence
/// boundary.
///
/// # Examples
///
/// ```ignore
/// let spec = KeySpec::generate(&OsRandom)?;
/// let recovery_key = spec.to_recovery_key();
///
/// // later, on another device
/// let recovered = KeySpec::from_recovery_key(&recovery_key)?;
/// assert_eq!(spec.as_bytes(), recovered.as_bytes());
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeySpec([u8; KEY_SIZE]);

impl fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeySpec([redacted])")
    }
}

impl From<[u8; KEY_SIZE]> for KeySpec {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        KeySpec(bytes)
    }
}

impl KeySpec {
    /// Generate fresh key material from the given random source
    pub fn generate(rng: &dyn RandomSource) -> Result<Self, KeySpecError> {
        let mut spec = KeySpec([0; KEY_SIZE]);
        rng.fill_bytes(&mut spec.0)?;
        Ok(spec)
    }

    /// Create key material from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `KEY_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, KeySpecError> {
        if data.len() != KEY_SIZE {
            return Err(KeySpecError::InvalidLength(data.len()));
        }
        let mut spec = KeySpec([0; KEY_SIZE]);
        spec.0.copy_from_slice(data);
        Ok(spec)
    }

    /// Decode key material from a (possibly space separated) recovery key
    pub fn from_recovery_key(recovery_key: &str) -> Result<Self, KeySpecError> {
        let bytes = decode_recovery_key(recovery_key)?;
        Ok(KeySpec(*bytes))
    }

    /// Encode this key material as a human-transcribable recovery key
    pub fn to_recovery_key(&self) -> String {
        encode_recovery_key(&self.0)
    }

    /// The algorithm this key material is produced for
    pub fn algorithm(&self) -> &'static str {
        SSSS_ALGORITHM_AES_HMAC_SHA2
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

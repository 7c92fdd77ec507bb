use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::encoding::{base64_decode, base64_encode};

/// Size of Ed25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Public half of a device signing identity
///
/// A thin wrapper around an Ed25519 `VerifyingKey`. Signatures over key
/// metadata are published under the key id `ed25519:<unpadded base64 key>`,
/// and trust oracles hold sets of these to decide whether a signature counts.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate()?;
/// let public_key = secret_key.public();
///
/// // Key ids carry the key as unpadded base64
/// let encoded = public_key.to_base64();
/// let recovered = PublicKey::from_base64(&encoded)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(VerifyingKey);

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        PublicKey(key)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        Self::from_bytes(&buff)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl PublicKey {
    /// Parse a public key from its compressed Edwards point
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Result<Self, KeyError> {
        let key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| anyhow::anyhow!("invalid public key: {}", e))?;
        Ok(PublicKey(key))
    }

    /// Parse a public key from (padded or unpadded) base64
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = base64_decode(encoded)
            .map_err(|_| anyhow::anyhow!("public key base64 decode error"))?;
        Self::try_from(bytes.as_slice())
    }

    /// Convert public key to raw bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Convert public key to unpadded base64, as used in signature key ids
    pub fn to_base64(&self) -> String {
        base64_encode(self.to_bytes())
    }

    /// Verify an Ed25519 signature on a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature verification fails
    pub fn verify(
        &self,
        msg: &[u8],
        signature: &ed25519_dalek::Signature,
    ) -> Result<(), ed25519_dalek::SignatureError> {
        self.0.verify_strict(msg, signature)
    }
}

/// Secret half of a device signing identity
///
/// Used to sign key metadata when a new storage key is created. The CLI keeps
/// it as a PEM file next to its config.
///
/// # Security Considerations
///
/// - Never publish this key alongside account data
/// - Store it with owner-only permissions (e.g., `~/.ssss/key.pem`)
///
/// # Examples
///
/// ```ignore
/// // Generate a new keypair
/// let secret_key = SecretKey::generate()?;
/// let public_key = secret_key.public();
///
/// // Persist to PEM format
/// let pem = secret_key.to_pem();
/// std::fs::write("key.pem", pem)?;
///
/// // Load from PEM
/// let pem = std::fs::read_to_string("key.pem")?;
/// let recovered = SecretKey::from_pem(&pem)?;
/// ```
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&self.public()).finish()
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&secret))
    }
}

impl SecretKey {
    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = zeroize::Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        getrandom::getrandom(bytes.as_mut_slice())
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self::from(*bytes))
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Convert secret key to raw bytes
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Encode secret key in PEM format for secure storage
    ///
    /// Returns a PEM-encoded string with tag "PRIVATE KEY".
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new("PRIVATE KEY", self.to_bytes());
        pem::encode(&pem)
    }

    /// Parse a secret key from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PEM string is malformed
    /// - The PEM tag is not "PRIVATE KEY"
    /// - The key size is incorrect
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str).map_err(|e| anyhow::anyhow!("failed to parse PEM: {}", e))?;

        if pem.tag() != "PRIVATE KEY" {
            return Err(anyhow::anyhow!("invalid PEM tag, expected PRIVATE KEY").into());
        }

        let contents = pem.contents();
        if contents.len() != PRIVATE_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid private key size in PEM, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                contents.len()
            )
            .into());
        }

        let mut bytes = zeroize::Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        bytes.copy_from_slice(contents);
        Ok(Self::from(*bytes))
    }

    /// Sign a message with this secret key using Ed25519.
    ///
    /// Returns a detached signature that can be verified with the corresponding public key.
    pub fn sign(&self, msg: &[u8]) -> ed25519_dalek::Signature {
        self.0.sign(msg)
    }
}

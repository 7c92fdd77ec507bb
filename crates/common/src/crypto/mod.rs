//! Cryptographic primitives for shared secret storage
//!
//! This module provides everything the storage layer needs to turn raw key
//! material into ciphertexts and back:
//!
//! - **Key material**: [`KeySpec`] holds 32 bytes of raw key material, scrubbed on drop
//! - **Recovery keys**: human-transcribable base58 encoding of a [`KeySpec`] with a parity byte
//! - **Derivation**: PBKDF2-HMAC-SHA512 from a passphrase, with progress and cancellation
//! - **Encryption**: `m.secret_storage.v1.aes-hmac-sha2` (HKDF-SHA256 subkeys, AES-256-CTR, HMAC-SHA256)
//! - **Identity**: Ed25519 keypairs used to sign key metadata
//!
//! # Secret Encryption
//!
//! Every secret is encrypted under subkeys derived from the storage key and the
//! secret's *name*:
//! 1. HKDF-SHA256 (32 zero bytes of salt, info = secret name) expands the key to 64 bytes
//! 2. The first 32 bytes key AES-256-CTR, the last 32 bytes key HMAC-SHA256
//! 3. A fresh 16 byte IV (bit 63 cleared) is drawn for every encryption
//! 4. The MAC covers the ciphertext and is checked before any decryption happens
//!
//! Because the name feeds the subkey derivation, a ciphertext stored for one
//! secret fails authentication when replayed as another.

mod aes_hmac;
mod derivation;
mod encoding;
mod key_spec;
mod keys;
mod random;
mod recovery_key;

pub use aes_hmac::{
    compute_key_check, decrypt, encrypt, verify_key_check, CipherError, EncryptedSecret,
    SSSS_ALGORITHM_AES_HMAC_SHA2,
};
pub use derivation::{
    derive_key, derive_key_blocking, generate_salt, DerivationError, ProgressListener,
    DEFAULT_ITERATIONS, DERIVED_KEY_BITS, PBKDF2_ALGORITHM, SALT_LENGTH,
};
pub use encoding::{base64_decode, base64_encode};
pub use key_spec::{KeySpec, KeySpecError, KEY_SIZE};
pub use keys::{KeyError, PublicKey, SecretKey};
pub use random::{OsRandom, RandomError, RandomSource};
pub use recovery_key::{decode_recovery_key, encode_recovery_key, RecoveryKeyError};

pub use ed25519_dalek::Signature;

/**
 * Account data collaborator.
 *  - The `AccountDataStore` trait the core persists through
 *  - An in-memory provider for tests and embedding
 */
pub mod account_data;
/**
 * Cryptographic types and operations.
 *  - Raw key material and its recovery-key encoding
 *  - Passphrase key derivation (PBKDF2-SHA512)
 *  - Secret encryption (AES-CTR + HMAC-SHA256)
 *  - Ed25519 signing identities
 */
pub mod crypto;
/**
 * Shared secret storage: key registry, default key
 *  bookkeeping, secret store and integrity checks,
 *  all layered over an `AccountDataStore`.
 */
pub mod storage;
/**
 * Signing and trust capabilities injected into
 *  the storage service.
 */
pub mod trust;

pub mod prelude {
    pub use crate::account_data::{AccountDataStore, MemoryAccountDataStore};
    pub use crate::crypto::{KeySpec, ProgressListener, PublicKey, SecretKey};
    pub use crate::storage::{
        IntegrityResult, KeyCreationInfo, KeyInfo, KeyInfoResult, KeyRef, SecretStorage,
        SecretStorageConfig, SecretStorageError,
    };
    pub use crate::trust::{Ed25519Signer, Ed25519TrustOracle, KeySigner, TrustOracle, TrustPolicy};
}

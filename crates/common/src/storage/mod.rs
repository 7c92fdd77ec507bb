//! Shared secret storage
//!
//! Layered over an [`AccountDataStore`](crate::account_data::AccountDataStore):
//!
//! ```text
//! m.secret_storage.key.<id>     key metadata (name, algorithm, passphrase params, key check, signatures)
//! m.secret_storage.default_key  { "key": <id> }
//! <secret name>                 { "encrypted": { <id>: { iv, ciphertext, mac } } }
//! ```
//!
//! [`SecretStorage`] is the only entry point. It keeps no state of its own
//!  beyond a writer lock, which clones share. Concurrent writes through clones
//!  of one instance merge per key id; separately constructed instances over
//!  the same store are last-writer-wins per record.

mod config;
mod content;
mod error;
mod integrity;
mod key_info;
mod service;

pub use config::SecretStorageConfig;
pub use content::{
    key_event_type, DefaultKeyContent, KeyInfoContent, PassphraseInfo, SecretContent,
    DEFAULT_KEY_EVENT_TYPE, KEY_EVENT_TYPE_PREFIX,
};
pub use error::SecretStorageError;
pub use integrity::{IntegrityFailure, IntegrityResult, MissingReason, MissingSecret};
pub use key_info::{KeyCreationInfo, KeyInfo, KeyInfoResult, KeyRef};
pub use service::SecretStorage;

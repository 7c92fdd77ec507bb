use std::fmt;

use zeroize::Zeroizing;

use crate::crypto::{KeySpec, SSSS_ALGORITHM_AES_HMAC_SHA2};

use super::content::KeyInfoContent;

/// A storage key's id together with its published metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub id: String,
    pub content: KeyInfoContent,
}

impl KeyInfo {
    /// Whether the key can be re-derived from a passphrase
    pub fn is_passphrase_based(&self) -> bool {
        self.content.passphrase.is_some()
    }
}

/// Outcome of looking up a key
///
/// Every call site has to decide what to do with a key it cannot use, so the
///  three cases are kept apart rather than folded into an `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfoResult {
    /// The key exists and uses an algorithm we implement
    Found(KeyInfo),
    /// No metadata is stored for this key id
    NotFound(String),
    /// Metadata exists but names an algorithm we cannot handle
    UnknownAlgorithm(KeyInfo),
}

impl KeyInfoResult {
    pub(crate) fn from_content(id: &str, content: Option<KeyInfoContent>) -> Self {
        match content {
            None => KeyInfoResult::NotFound(id.to_string()),
            Some(content) => {
                let info = KeyInfo {
                    id: id.to_string(),
                    content,
                };
                if info.content.algorithm == SSSS_ALGORITHM_AES_HMAC_SHA2 {
                    KeyInfoResult::Found(info)
                } else {
                    KeyInfoResult::UnknownAlgorithm(info)
                }
            }
        }
    }

    pub fn key_id(&self) -> &str {
        match self {
            KeyInfoResult::Found(info) | KeyInfoResult::UnknownAlgorithm(info) => &info.id,
            KeyInfoResult::NotFound(id) => id,
        }
    }

    /// The usable key, if any
    pub fn found(self) -> Option<KeyInfo> {
        match self {
            KeyInfoResult::Found(info) => Some(info),
            _ => None,
        }
    }
}

/// Everything produced when a new key is generated
///
/// `key_spec` and `recovery_key` are the only copies of the raw key material;
///  they are meant to be shown to the user or used immediately, then dropped.
pub struct KeyCreationInfo {
    pub key_id: String,
    pub content: KeyInfoContent,
    pub recovery_key: Zeroizing<String>,
    pub key_spec: KeySpec,
}

impl fmt::Debug for KeyCreationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCreationInfo")
            .field("key_id", &self.key_id)
            .field("content", &self.content)
            .field("recovery_key", &"[redacted]")
            .field("key_spec", &self.key_spec)
            .finish()
    }
}

/// A key to encrypt a secret for
///
/// `key_id: None` means the default key. The key material itself has to be
///  supplied; it is never looked up from storage.
#[derive(Debug, Clone)]
pub struct KeyRef {
    pub key_id: Option<String>,
    pub key_spec: Option<KeySpec>,
}

impl KeyRef {
    pub fn new(key_id: impl Into<String>, key_spec: KeySpec) -> Self {
        Self {
            key_id: Some(key_id.into()),
            key_spec: Some(key_spec),
        }
    }

    /// Encrypt for whichever key is currently the default
    pub fn default_key(key_spec: KeySpec) -> Self {
        Self {
            key_id: None,
            key_spec: Some(key_spec),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn content(algorithm: &str) -> KeyInfoContent {
        KeyInfoContent {
            name: "k".to_string(),
            algorithm: algorithm.to_string(),
            passphrase: None,
            iv: None,
            mac: None,
            signatures: Default::default(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            KeyInfoResult::from_content("k1", None),
            KeyInfoResult::NotFound("k1".to_string())
        );
        assert!(matches!(
            KeyInfoResult::from_content("k1", Some(content(SSSS_ALGORITHM_AES_HMAC_SHA2))),
            KeyInfoResult::Found(_)
        ));
        let unknown = KeyInfoResult::from_content("k1", Some(content("org.example.v2")));
        assert!(matches!(unknown, KeyInfoResult::UnknownAlgorithm(_)));
        assert_eq!(unknown.key_id(), "k1");
        assert!(unknown.found().is_none());
    }
}

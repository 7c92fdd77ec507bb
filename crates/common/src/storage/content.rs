//! Account data record layouts

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::EncryptedSecret;
use crate::trust::Signatures;

/// Prefix of the per-key metadata record type
pub const KEY_EVENT_TYPE_PREFIX: &str = "m.secret_storage.key.";
/// Record type holding the default key pointer
pub const DEFAULT_KEY_EVENT_TYPE: &str = "m.secret_storage.default_key";

/// Record type under which the metadata for `key_id` is stored
pub fn key_event_type(key_id: &str) -> String {
    format!("{}{}", KEY_EVENT_TYPE_PREFIX, key_id)
}

/// Parameters needed to re-derive a passphrase-backed key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassphraseInfo {
    pub algorithm: String,
    pub salt: String,
    pub iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<u32>,
    /// Parameters we do not interpret, kept so signatures still verify
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Public description of a storage key
///
/// This is everything about a key that is persisted. It never contains raw key
///  material; `iv`/`mac` are a key check computed over zero bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfoContent {
    #[serde(default)]
    pub name: String,
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<PassphraseInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signatures: Signatures,
    /// Fields we do not model; they are part of the signed data
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl KeyInfoContent {
    /// Canonical JSON of this content with `signatures` stripped
    ///
    /// `serde_json::Value` objects keep their keys sorted, so serializing
    ///  through it yields the same bytes for the same content on every device.
    ///  Unmodelled fields round-trip through `extra` and are signed as stored.
    pub fn signable_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("signatures");
        }
        serde_json::to_vec(&value)
    }
}

/// Content of the default key pointer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultKeyContent {
    pub key: String,
}

/// Content of a secret record: one ciphertext per key id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretContent {
    #[serde(default)]
    pub encrypted: BTreeMap<String, EncryptedSecret>,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn content() -> KeyInfoContent {
        KeyInfoContent {
            name: "backup".to_string(),
            algorithm: "m.secret_storage.v1.aes-hmac-sha2".to_string(),
            passphrase: Some(PassphraseInfo {
                algorithm: "m.pbkdf2".to_string(),
                salt: "abc".to_string(),
                iterations: 10,
                bits: None,
                extra: BTreeMap::new(),
            }),
            iv: Some("aXY".to_string()),
            mac: Some("bWFj".to_string()),
            signatures: Signatures::new(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_signable_json_is_sorted_and_compact() {
        let mut content = content();
        content
            .signatures
            .entry("@alice:example.org".to_string())
            .or_default()
            .insert("ed25519:abc".to_string(), "sig".to_string());

        let json = String::from_utf8(content.signable_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"algorithm":"m.secret_storage.v1.aes-hmac-sha2","iv":"aXY","mac":"bWFj","name":"backup","passphrase":{"algorithm":"m.pbkdf2","iterations":10,"salt":"abc"}}"#
        );
    }

    #[test]
    fn test_signing_input_ignores_signatures() {
        let unsigned = content();
        let mut signed = content();
        signed
            .signatures
            .entry("@alice:example.org".to_string())
            .or_default()
            .insert("ed25519:abc".to_string(), "sig".to_string());
        assert_eq!(
            unsigned.signable_json().unwrap(),
            signed.signable_json().unwrap()
        );
    }

    #[test]
    fn test_signable_json_keeps_unknown_fields() {
        let stored = json!({
            "algorithm": "org.example.future",
            "name": "k",
            "passphrase": {"algorithm": "m.pbkdf2", "salt": "s", "iterations": 5, "memory": 64},
            "pubkey": "abcd",
            "signatures": {"@alice:example.org": {"ed25519:abc": "sig"}}
        });
        let content: KeyInfoContent = serde_json::from_value(stored.clone()).unwrap();
        assert_eq!(content.extra["pubkey"], json!("abcd"));
        assert!(content.signatures.contains_key("@alice:example.org"));

        let mut expected = stored;
        expected.as_object_mut().unwrap().remove("signatures");
        assert_eq!(
            content.signable_json().unwrap(),
            serde_json::to_vec(&expected).unwrap()
        );
    }

    #[test]
    fn test_parse_minimal_key_record() {
        let content: KeyInfoContent =
            serde_json::from_value(json!({"algorithm": "org.example.future"})).unwrap();
        assert_eq!(content.name, "");
        assert!(content.passphrase.is_none());
        assert!(content.signatures.is_empty());
    }

    #[test]
    fn test_secret_record_layout() {
        let value = json!({
            "encrypted": {
                "k1": {"iv": "a", "ciphertext": "b", "mac": "c"}
            }
        });
        let content: SecretContent = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(content.encrypted["k1"].ciphertext, "b");
        assert_eq!(serde_json::to_value(&content).unwrap(), value);
    }

    #[test]
    fn test_key_event_type() {
        assert_eq!(key_event_type("k1"), "m.secret_storage.key.k1");
    }
}

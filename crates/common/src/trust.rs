use std::collections::{BTreeMap, HashMap, HashSet};

use crate::crypto::{base64_decode, base64_encode, PublicKey, SecretKey, Signature};

/// Prefix of the key id under which an Ed25519 signature is published
pub const ED25519_KEY_ID_PREFIX: &str = "ed25519:";

/// Signatures attached to key metadata: signer -> signing key id -> signature
pub type Signatures = BTreeMap<String, BTreeMap<String, String>>;

/// Something able to sign the public description of a new storage key
///
/// `canonical_json` is the key metadata with its `signatures` field removed,
///  serialized with sorted keys and no insignificant whitespace.
pub trait KeySigner: Send + Sync {
    fn sign(&self, canonical_json: &[u8]) -> Signatures;
}

/// Decides whether a single signature over key metadata is acceptable
///
/// The storage service never manages signing identities itself; callers plug
///  in whatever device or cross-signing trust they have.
pub trait TrustOracle: Send + Sync + std::fmt::Debug {
    fn is_signature_valid(
        &self,
        signer: &str,
        key_id: &str,
        signature: &str,
        signed_data: &[u8],
    ) -> bool;
}

/// How many valid signatures a key needs before it is trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Zero disables the signature requirement
    pub min_valid_signatures: usize,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            min_valid_signatures: 1,
        }
    }
}

impl TrustPolicy {
    pub fn require(min_valid_signatures: usize) -> Self {
        Self {
            min_valid_signatures,
        }
    }

    /// Count the signatures the oracle accepts and compare against the policy
    pub fn evaluate(
        &self,
        oracle: &dyn TrustOracle,
        signatures: &Signatures,
        signed_data: &[u8],
    ) -> bool {
        if self.min_valid_signatures == 0 {
            return true;
        }

        let valid = signatures
            .iter()
            .flat_map(|(signer, by_key)| {
                by_key
                    .iter()
                    .map(move |(key_id, signature)| (signer, key_id, signature))
            })
            .filter(|(signer, key_id, signature)| {
                oracle.is_signature_valid(signer, key_id, signature, signed_data)
            })
            .count();

        valid >= self.min_valid_signatures
    }
}

/// Signs key metadata with a device's Ed25519 identity
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
    user_id: String,
    secret_key: SecretKey,
}

impl Ed25519Signer {
    pub fn new(user_id: impl Into<String>, secret_key: SecretKey) -> Self {
        Self {
            user_id: user_id.into(),
            secret_key,
        }
    }

    /// The key id this signer publishes signatures under
    pub fn key_id(&self) -> String {
        ed25519_key_id(&self.secret_key.public())
    }
}

impl KeySigner for Ed25519Signer {
    fn sign(&self, canonical_json: &[u8]) -> Signatures {
        let signature = self.secret_key.sign(canonical_json);
        let mut by_key = BTreeMap::new();
        by_key.insert(self.key_id(), base64_encode(signature.to_bytes()));

        let mut signatures = Signatures::new();
        signatures.insert(self.user_id.clone(), by_key);
        signatures
    }
}

/// Build the `ed25519:<base64>` key id for a public key
pub fn ed25519_key_id(public_key: &PublicKey) -> String {
    format!("{}{}", ED25519_KEY_ID_PREFIX, public_key.to_base64())
}

/// Accepts Ed25519 signatures from an explicit set of trusted keys
#[derive(Debug, Clone, Default)]
pub struct Ed25519TrustOracle {
    trusted: HashMap<String, HashSet<PublicKey>>,
}

impl Ed25519TrustOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `public_key` when it signs as `signer`
    pub fn with_trusted_key(mut self, signer: impl Into<String>, public_key: PublicKey) -> Self {
        self.trust(signer, public_key);
        self
    }

    pub fn trust(&mut self, signer: impl Into<String>, public_key: PublicKey) {
        self.trusted
            .entry(signer.into())
            .or_default()
            .insert(public_key);
    }
}

impl TrustOracle for Ed25519TrustOracle {
    fn is_signature_valid(
        &self,
        signer: &str,
        key_id: &str,
        signature: &str,
        signed_data: &[u8],
    ) -> bool {
        let Some(trusted) = self.trusted.get(signer) else {
            return false;
        };
        let Some(encoded_key) = key_id.strip_prefix(ED25519_KEY_ID_PREFIX) else {
            return false;
        };
        let Ok(public_key) = PublicKey::from_base64(encoded_key) else {
            return false;
        };
        if !trusted.contains(&public_key) {
            return false;
        }
        let Ok(bytes) = base64_decode(signature) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&bytes) else {
            return false;
        };

        match public_key.verify(signed_data, &signature) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("signature by {} ({}) failed verification: {}", signer, key_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DATA: &[u8] = br#"{"algorithm":"m.secret_storage.v1.aes-hmac-sha2","name":"k"}"#;

    fn signer(user_id: &str) -> (Ed25519Signer, PublicKey) {
        let secret_key = SecretKey::generate().unwrap();
        let public_key = secret_key.public();
        (Ed25519Signer::new(user_id, secret_key), public_key)
    }

    #[test]
    fn test_signer_layout() {
        let (signer, public_key) = signer("@alice:example.org");
        let signatures = signer.sign(DATA);

        let by_key = signatures.get("@alice:example.org").unwrap();
        let key_id = format!("ed25519:{}", public_key.to_base64());
        assert!(by_key.contains_key(&key_id));
        assert_eq!(signer.key_id(), key_id);
    }

    #[test]
    fn test_oracle_accepts_trusted_signer() {
        let (signer, public_key) = signer("@alice:example.org");
        let signatures = signer.sign(DATA);
        let oracle = Ed25519TrustOracle::new().with_trusted_key("@alice:example.org", public_key);

        assert!(TrustPolicy::default().evaluate(&oracle, &signatures, DATA));
    }

    #[test]
    fn test_oracle_rejects_untrusted_or_tampered() {
        let (signer, signer_key) = signer("@alice:example.org");
        let (_, other_key) = self::signer("@alice:example.org");
        let signatures = signer.sign(DATA);

        // key is not in the trusted set
        let oracle = Ed25519TrustOracle::new().with_trusted_key("@alice:example.org", other_key);
        assert!(!TrustPolicy::default().evaluate(&oracle, &signatures, DATA));

        // right key, but signed by a different user id
        let oracle = Ed25519TrustOracle::new().with_trusted_key("@bob:example.org", signer_key);
        assert!(!TrustPolicy::default().evaluate(&oracle, &signatures, DATA));

        // trusted key, tampered data
        let (signer, public_key) = self::signer("@alice:example.org");
        let signatures = signer.sign(DATA);
        let oracle = Ed25519TrustOracle::new().with_trusted_key("@alice:example.org", public_key);
        assert!(!TrustPolicy::default().evaluate(&oracle, &signatures, b"{}"));
    }

    #[test]
    fn test_policy_thresholds() {
        let (alice, alice_key) = signer("@alice:example.org");
        let (device, device_key) = signer("@alice:example.org");
        let mut signatures = alice.sign(DATA);
        for (user, by_key) in device.sign(DATA) {
            signatures.entry(user).or_default().extend(by_key);
        }

        let oracle = Ed25519TrustOracle::new()
            .with_trusted_key("@alice:example.org", alice_key)
            .with_trusted_key("@alice:example.org", device_key);

        assert!(TrustPolicy::require(2).evaluate(&oracle, &signatures, DATA));
        assert!(!TrustPolicy::require(3).evaluate(&oracle, &signatures, DATA));
        assert!(TrustPolicy::require(0).evaluate(&oracle, &Signatures::new(), DATA));
        assert!(!TrustPolicy::default().evaluate(&oracle, &Signatures::new(), DATA));
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::account_data::AccountDataStore;
use crate::crypto::{
    compute_key_check, decrypt, derive_key, encrypt, generate_salt, verify_key_check,
    DerivationError, KeySpec, OsRandom, ProgressListener, RandomSource, DERIVED_KEY_BITS,
    PBKDF2_ALGORITHM, SSSS_ALGORITHM_AES_HMAC_SHA2,
};
use crate::trust::{KeySigner, TrustOracle};

use super::config::SecretStorageConfig;
use super::content::{
    key_event_type, DefaultKeyContent, KeyInfoContent, PassphraseInfo, SecretContent,
    DEFAULT_KEY_EVENT_TYPE, KEY_EVENT_TYPE_PREFIX,
};
use super::error::SecretStorageError;
use super::integrity::{IntegrityFailure, IntegrityResult, MissingReason, MissingSecret};
use super::key_info::{KeyCreationInfo, KeyInfo, KeyInfoResult, KeyRef};

/// Shared secret storage over an account data store
///
/// One instance covers the key registry, the default key pointer, the secret
///  store and the integrity check. Everything persistent lives in `S`; the
///  only local state is a single-writer lock serialising read-modify-write
///  cycles. Clones share that lock.
///
/// Raw key material is never persisted. It is passed in (or handed out on key
///  creation) and only held for the call that needs it.
#[derive(Debug, Clone)]
pub struct SecretStorage<S: AccountDataStore> {
    store: S,
    trust: Arc<dyn TrustOracle>,
    rng: Arc<dyn RandomSource>,
    config: SecretStorageConfig,
    write_lock: Arc<RwLock<()>>,
}

impl<S: AccountDataStore> SecretStorage<S> {
    pub fn new(store: S, trust: Arc<dyn TrustOracle>) -> Self {
        Self {
            store,
            trust,
            rng: Arc::new(OsRandom),
            config: SecretStorageConfig::default(),
            write_lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn with_config(mut self, config: SecretStorageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_random_source(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SecretStorageConfig {
        &self.config
    }

    /* Key registry */

    /// Generate a new random key and publish its metadata
    ///
    /// If a `signer` is given, its signature over the metadata is attached.
    ///
    /// # Errors
    ///
    /// * `KeyAlreadyExists` - metadata for `key_id` is already stored
    /// * `CollaboratorUnavailable` - the account data store failed
    pub async fn generate_key(
        &self,
        key_id: &str,
        name: &str,
        signer: Option<&dyn KeySigner>,
    ) -> Result<KeyCreationInfo, SecretStorageError> {
        let key_spec = KeySpec::generate(self.rng.as_ref())?;
        self.create_key(key_id, name, key_spec, None, signer).await
    }

    /// Derive a new key from a passphrase and publish its metadata
    ///
    /// A fresh salt is generated and recorded with the configured iteration
    ///  count. The derivation runs on the blocking pool; if `cancel` fires
    ///  nothing is written and `DerivationCancelled` is returned.
    pub async fn generate_key_with_passphrase(
        &self,
        key_id: &str,
        name: &str,
        passphrase: &str,
        signer: &dyn KeySigner,
        progress: Option<Arc<dyn ProgressListener>>,
        cancel: Option<CancellationToken>,
    ) -> Result<KeyCreationInfo, SecretStorageError> {
        // fail fast before spending seconds on pbkdf2; re-checked under the lock
        if self.has_key(key_id).await? {
            return Err(SecretStorageError::KeyAlreadyExists(key_id.to_string()));
        }

        let salt = generate_salt(self.rng.as_ref()).map_err(DerivationError::from)?;
        let iterations = self.config.pbkdf2_iterations;
        tracing::debug!(
            "deriving key {} from passphrase ({} iterations)",
            key_id,
            iterations
        );
        let key_spec = derive_key(passphrase, &salt, iterations, progress, cancel).await?;

        let passphrase = PassphraseInfo {
            algorithm: PBKDF2_ALGORITHM.to_string(),
            salt,
            iterations,
            bits: Some(DERIVED_KEY_BITS),
            extra: Default::default(),
        };
        self.create_key(key_id, name, key_spec, Some(passphrase), Some(signer))
            .await
    }

    async fn create_key(
        &self,
        key_id: &str,
        name: &str,
        key_spec: KeySpec,
        passphrase: Option<PassphraseInfo>,
        signer: Option<&dyn KeySigner>,
    ) -> Result<KeyCreationInfo, SecretStorageError> {
        let event_type = key_event_type(key_id);
        let check = compute_key_check(&key_spec, self.rng.as_ref())?;
        let mut content = KeyInfoContent {
            name: name.to_string(),
            algorithm: SSSS_ALGORITHM_AES_HMAC_SHA2.to_string(),
            passphrase,
            iv: Some(check.iv),
            mac: Some(check.mac),
            signatures: Default::default(),
            extra: Default::default(),
        };
        if let Some(signer) = signer {
            let signed = content
                .signable_json()
                .map_err(|e| malformed(&event_type, e))?;
            content.signatures = signer.sign(&signed);
        }

        let _guard = self.write_lock.write().await;
        if self.read_record::<KeyInfoContent>(&event_type).await?.is_some() {
            return Err(SecretStorageError::KeyAlreadyExists(key_id.to_string()));
        }
        self.write_record(&event_type, &content).await?;

        tracing::info!(
            "created secret storage key {} (passphrase: {}, signed: {})",
            key_id,
            content.passphrase.is_some(),
            !content.signatures.is_empty()
        );
        Ok(KeyCreationInfo {
            key_id: key_id.to_string(),
            content,
            recovery_key: Zeroizing::new(key_spec.to_recovery_key()),
            key_spec,
        })
    }

    pub async fn get_key(&self, key_id: &str) -> Result<KeyInfoResult, SecretStorageError> {
        let content = self.read_record(&key_event_type(key_id)).await?;
        Ok(KeyInfoResult::from_content(key_id, content))
    }

    /// Look up the key the default pointer refers to
    ///
    /// Returns `NoDefaultKey` if no pointer is set, and `Ok(NotFound)` if the
    ///  pointer names a key whose metadata has since disappeared.
    pub async fn get_default_key(&self) -> Result<KeyInfoResult, SecretStorageError> {
        let _guard = self.write_lock.read().await;
        let key_id = self.resolve_key_id(None).await?;
        self.get_key(&key_id).await
    }

    /// Point the default key at `key_id`
    ///
    /// Leaves the previous default untouched if `key_id` does not exist.
    pub async fn set_default_key(&self, key_id: &str) -> Result<(), SecretStorageError> {
        let _guard = self.write_lock.write().await;
        if !self.has_key(key_id).await? {
            return Err(SecretStorageError::KeyNotFound(key_id.to_string()));
        }
        self.write_record(
            DEFAULT_KEY_EVENT_TYPE,
            &DefaultKeyContent {
                key: key_id.to_string(),
            },
        )
        .await?;

        tracing::info!("default secret storage key set to {}", key_id);
        Ok(())
    }

    /// Whether metadata exists for `key_id`. Says nothing about trust.
    pub async fn has_key(&self, key_id: &str) -> Result<bool, SecretStorageError> {
        Ok(self
            .store
            .get(&key_event_type(key_id))
            .await?
            .is_some())
    }

    /// Ids of every key with stored metadata
    pub async fn key_ids(&self) -> Result<Vec<String>, SecretStorageError> {
        Ok(self
            .store
            .event_types()
            .await?
            .into_iter()
            .filter_map(|t| t.strip_prefix(KEY_EVENT_TYPE_PREFIX).map(str::to_string))
            .collect())
    }

    /// Check a candidate key against the key check in `key_id`'s metadata
    ///
    /// Keys published without a key check accept any material.
    pub async fn check_key(
        &self,
        key_id: &str,
        key_spec: &KeySpec,
    ) -> Result<bool, SecretStorageError> {
        let info = self.usable_key(key_id).await?;
        Ok(matches_key_check(&info, key_spec)?)
    }

    /// Re-derive the key material of an existing passphrase key
    ///
    /// Uses the salt and iteration count from the key's metadata, then
    ///  confirms the result against its key check.
    ///
    /// # Errors
    ///
    /// * `NoPassphrase` - the key is not passphrase based
    /// * `AuthenticationFailure` - the passphrase is wrong
    /// * `DerivationCancelled` - `cancel` fired
    pub async fn key_spec_from_passphrase(
        &self,
        key_id: &str,
        passphrase: &str,
        progress: Option<Arc<dyn ProgressListener>>,
        cancel: Option<CancellationToken>,
    ) -> Result<KeySpec, SecretStorageError> {
        let info = self.usable_key(key_id).await?;
        let params = info
            .content
            .passphrase
            .as_ref()
            .ok_or_else(|| SecretStorageError::NoPassphrase(key_id.to_string()))?;
        if params.algorithm != PBKDF2_ALGORITHM
            || params.bits.is_some_and(|bits| bits != DERIVED_KEY_BITS)
        {
            return Err(SecretStorageError::UnknownAlgorithm {
                key_id: key_id.to_string(),
                algorithm: params.algorithm.clone(),
            });
        }

        let key_spec =
            derive_key(passphrase, &params.salt, params.iterations, progress, cancel).await?;
        if !matches_key_check(&info, &key_spec)? {
            tracing::warn!("passphrase does not match key {}", key_id);
            return Err(SecretStorageError::AuthenticationFailure);
        }
        Ok(key_spec)
    }

    /* Secret store */

    /// Encrypt `secret` for every key in `keys` and merge the ciphertexts into
    ///  the secret's record
    ///
    /// All keys are resolved and checked before anything is written, so either
    ///  every ciphertext is stored or none is. Entries for key ids not in `keys`
    ///  are preserved.
    ///
    /// This does not check key trust; callers that require it should call
    ///  [`Self::require_trusted_key`] first.
    ///
    /// # Errors
    ///
    /// * `NoDefaultKey` - a `KeyRef` without id, and no default key
    /// * `KeyNotFound` / `UnknownAlgorithm` - a referenced key is unusable
    /// * `MissingKeySpec` - a `KeyRef` carries no key material
    /// * `AuthenticationFailure` - the key material fails the key check
    pub async fn store_secret(
        &self,
        name: &str,
        secret: &[u8],
        keys: &[KeyRef],
    ) -> Result<(), SecretStorageError> {
        if name.starts_with(KEY_EVENT_TYPE_PREFIX) || name == DEFAULT_KEY_EVENT_TYPE {
            return Err(SecretStorageError::ReservedName(name.to_string()));
        }

        let _guard = self.write_lock.write().await;

        let mut encrypted = BTreeMap::new();
        for key_ref in keys {
            let key_id = self.resolve_key_id(key_ref.key_id.as_deref()).await?;
            let info = self.usable_key(&key_id).await?;
            let key_spec = key_ref
                .key_spec
                .as_ref()
                .ok_or_else(|| SecretStorageError::MissingKeySpec(key_id.clone()))?;
            if !matches_key_check(&info, key_spec)? {
                tracing::warn!("refusing to store {}: key check failed for {}", name, key_id);
                return Err(SecretStorageError::AuthenticationFailure);
            }
            encrypted.insert(key_id, encrypt(key_spec, name, secret, self.rng.as_ref())?);
        }

        if encrypted.is_empty() {
            tracing::debug!("no keys given for secret {}, nothing stored", name);
            return Ok(());
        }

        let mut record: SecretContent = self.read_record(name).await?.unwrap_or_default();
        let key_ids: Vec<String> = encrypted.keys().cloned().collect();
        record.encrypted.extend(encrypted);
        self.write_record(name, &record).await?;

        tracing::info!("stored secret {} for keys {:?}", name, key_ids);
        Ok(())
    }

    /// Every key `name` is encrypted for, resolved through the key registry
    ///
    /// An unknown secret yields an empty list.
    pub async fn get_algorithms_for_secret(
        &self,
        name: &str,
    ) -> Result<Vec<KeyInfoResult>, SecretStorageError> {
        let Some(record) = self.read_record::<SecretContent>(name).await? else {
            return Ok(Vec::new());
        };

        let mut results = Vec::with_capacity(record.encrypted.len());
        for key_id in record.encrypted.keys() {
            results.push(self.get_key(key_id).await?);
        }
        Ok(results)
    }

    /// Decrypt `name` with `key_spec`, using `key_id` or the default key
    ///
    /// # Errors
    ///
    /// * `NoDefaultKey` - no `key_id` given and no default key
    /// * `KeyNotFound` / `UnknownAlgorithm` - the key is unusable
    /// * `SecretNotFound` - `name` is not encrypted for the key
    /// * `AuthenticationFailure` - wrong key or corrupted ciphertext
    pub async fn get_secret(
        &self,
        name: &str,
        key_id: Option<&str>,
        key_spec: &KeySpec,
    ) -> Result<Zeroizing<Vec<u8>>, SecretStorageError> {
        let (key_id, encrypted) = {
            let _guard = self.write_lock.read().await;
            let key_id = self.resolve_key_id(key_id).await?;
            self.usable_key(&key_id).await?;
            let encrypted = self
                .read_record::<SecretContent>(name)
                .await?
                .and_then(|mut record| record.encrypted.remove(&key_id))
                .ok_or_else(|| SecretStorageError::SecretNotFound {
                    name: name.to_string(),
                    key_id: key_id.clone(),
                })?;
            (key_id, encrypted)
        };

        decrypt(key_spec, name, &encrypted).map_err(|e| {
            tracing::warn!("failed to decrypt secret {} with key {}: {}", name, key_id, e);
            SecretStorageError::from(e)
        })
    }

    /* Integrity */

    /// Check that every secret in `names` is stored for the key, and that the
    ///  key itself is trusted
    ///
    /// A `Success` means `get_secret` will succeed for each name given the
    ///  right key material. Missing secrets and distrust are reported together
    ///  in one `Failure`; only an unresolvable key is returned as an error.
    pub async fn check_should_be_able_to_access_secrets(
        &self,
        names: &[&str],
        key_id: Option<&str>,
    ) -> Result<IntegrityResult, SecretStorageError> {
        let _guard = self.write_lock.read().await;
        let key_id = self.resolve_key_id(key_id).await?;
        let info = self.usable_key(&key_id).await?;

        let mut missing = Vec::new();
        for name in names {
            let reason = match self.read_record::<SecretContent>(name).await? {
                None => Some(MissingReason::UnknownSecret),
                Some(record) if !record.encrypted.contains_key(&key_id) => {
                    Some(MissingReason::NotEncryptedWithKey)
                }
                Some(_) => None,
            };
            if let Some(reason) = reason {
                missing.push(MissingSecret {
                    name: name.to_string(),
                    reason,
                });
            }
        }

        let key_trusted = self.evaluate_trust(&info)?;
        if missing.is_empty() && key_trusted {
            return Ok(IntegrityResult::Success {
                passphrase_based: info.is_passphrase_based(),
            });
        }

        tracing::debug!(
            "integrity check failed for key {}: {} missing, trusted: {}",
            key_id,
            missing.len(),
            key_trusted
        );
        Ok(IntegrityResult::Failure(IntegrityFailure {
            key_id,
            missing,
            key_trusted,
        }))
    }

    /// Whether `key_id` carries enough valid signatures under the trust policy
    pub async fn is_key_trusted(&self, key_id: &str) -> Result<bool, SecretStorageError> {
        let info = match self.get_key(key_id).await? {
            KeyInfoResult::Found(info) | KeyInfoResult::UnknownAlgorithm(info) => info,
            KeyInfoResult::NotFound(id) => return Err(SecretStorageError::KeyNotFound(id)),
        };
        self.evaluate_trust(&info)
    }

    /// Like [`Self::is_key_trusted`], but fails with `KeyUntrusted`
    pub async fn require_trusted_key(&self, key_id: &str) -> Result<(), SecretStorageError> {
        if self.is_key_trusted(key_id).await? {
            Ok(())
        } else {
            Err(SecretStorageError::KeyUntrusted(key_id.to_string()))
        }
    }

    /* Helpers; none of these take the lock */

    fn evaluate_trust(&self, info: &KeyInfo) -> Result<bool, SecretStorageError> {
        let signed = info
            .content
            .signable_json()
            .map_err(|e| malformed(&key_event_type(&info.id), e))?;
        let trusted =
            self.config
                .trust_policy
                .evaluate(self.trust.as_ref(), &info.content.signatures, &signed);
        if !trusted {
            tracing::warn!("secret storage key {} is not trusted", info.id);
        }
        Ok(trusted)
    }

    /// Explicit id, or whatever the default pointer names
    async fn resolve_key_id(&self, key_id: Option<&str>) -> Result<String, SecretStorageError> {
        if let Some(key_id) = key_id {
            return Ok(key_id.to_string());
        }
        self.read_record::<DefaultKeyContent>(DEFAULT_KEY_EVENT_TYPE)
            .await?
            .map(|content| content.key)
            .ok_or(SecretStorageError::NoDefaultKey)
    }

    /// Metadata for a key we can actually encrypt/decrypt with
    async fn usable_key(&self, key_id: &str) -> Result<KeyInfo, SecretStorageError> {
        match self.get_key(key_id).await? {
            KeyInfoResult::Found(info) => Ok(info),
            KeyInfoResult::NotFound(id) => Err(SecretStorageError::KeyNotFound(id)),
            KeyInfoResult::UnknownAlgorithm(info) => Err(SecretStorageError::UnknownAlgorithm {
                key_id: info.id,
                algorithm: info.content.algorithm,
            }),
        }
    }

    async fn read_record<T: DeserializeOwned>(
        &self,
        event_type: &str,
    ) -> Result<Option<T>, SecretStorageError> {
        match self.store.get(event_type).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| malformed(event_type, e)),
        }
    }

    async fn write_record<T: Serialize + Sync>(
        &self,
        event_type: &str,
        content: &T,
    ) -> Result<(), SecretStorageError> {
        let value = serde_json::to_value(content).map_err(|e| malformed(event_type, e))?;
        self.store.put(event_type, value).await?;
        Ok(())
    }
}

fn malformed(event_type: &str, e: serde_json::Error) -> SecretStorageError {
    SecretStorageError::MalformedRecord {
        event_type: event_type.to_string(),
        reason: e.to_string(),
    }
}

fn matches_key_check(info: &KeyInfo, key_spec: &KeySpec) -> Result<bool, SecretStorageError> {
    match (&info.content.iv, &info.content.mac) {
        (Some(iv), Some(mac)) => Ok(verify_key_check(key_spec, iv, mac)?),
        _ => Ok(true),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::account_data::MemoryAccountDataStore;
    use crate::trust::Ed25519TrustOracle;
    use serde_json::json;

    fn storage() -> SecretStorage<MemoryAccountDataStore> {
        SecretStorage::new(
            MemoryAccountDataStore::new(),
            Arc::new(Ed25519TrustOracle::new()),
        )
    }

    #[tokio::test]
    async fn test_generate_key_publishes_metadata() {
        let storage = storage();
        let info = storage.generate_key("k1", "backup", None).await.unwrap();

        assert_eq!(info.key_id, "k1");
        assert!(info.recovery_key.starts_with('E'));
        let recovered = KeySpec::from_recovery_key(&info.recovery_key).unwrap();
        assert_eq!(recovered.as_bytes(), info.key_spec.as_bytes());

        let stored = storage
            .store()
            .get("m.secret_storage.key.k1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["algorithm"], SSSS_ALGORITHM_AES_HMAC_SHA2);
        assert_eq!(stored["name"], "backup");
        assert!(stored.get("passphrase").is_none());
        // raw key material never reaches the store
        let raw = serde_json::to_string(&stored).unwrap();
        assert!(!raw.contains(&hex::encode(info.key_spec.as_bytes())));
    }

    #[tokio::test]
    async fn test_generate_key_twice_fails() {
        let storage = storage();
        storage.generate_key("k1", "a", None).await.unwrap();
        assert!(matches!(
            storage.generate_key("k1", "b", None).await,
            Err(SecretStorageError::KeyAlreadyExists(id)) if id == "k1"
        ));
    }

    #[tokio::test]
    async fn test_unknown_algorithm() {
        let storage = storage();
        storage
            .store()
            .put(
                "m.secret_storage.key.future",
                json!({"name": "f", "algorithm": "org.example.v9"}),
            )
            .await
            .unwrap();

        assert!(matches!(
            storage.get_key("future").await.unwrap(),
            KeyInfoResult::UnknownAlgorithm(_)
        ));
        assert!(storage.has_key("future").await.unwrap());

        let spec = KeySpec::from([1u8; 32]);
        assert!(matches!(
            storage
                .store_secret("s", b"x", &[KeyRef::new("future", spec)])
                .await,
            Err(SecretStorageError::UnknownAlgorithm { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_record() {
        let storage = storage();
        storage
            .store()
            .put("m.secret_storage.key.bad", json!({"name": 12}))
            .await
            .unwrap();
        assert!(matches!(
            storage.get_key("bad").await,
            Err(SecretStorageError::MalformedRecord { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_secret_rejects_wrong_key_material() {
        let storage = storage();
        storage.generate_key("k1", "a", None).await.unwrap();
        let wrong = KeySpec::from([9u8; 32]);

        assert!(matches!(
            storage
                .store_secret("s", b"x", &[KeyRef::new("k1", wrong)])
                .await,
            Err(SecretStorageError::AuthenticationFailure)
        ));
        assert!(storage.store().get("s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_secret_is_all_or_nothing() {
        let storage = storage();
        let k1 = storage.generate_key("k1", "a", None).await.unwrap();

        let result = storage
            .store_secret(
                "s",
                b"x",
                &[
                    KeyRef::new("k1", k1.key_spec.clone()),
                    KeyRef::new("missing", k1.key_spec.clone()),
                ],
            )
            .await;
        assert!(matches!(result, Err(SecretStorageError::KeyNotFound(id)) if id == "missing"));
        assert!(storage.store().get("s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_secret_requires_key_material() {
        let storage = storage();
        storage.generate_key("k1", "a", None).await.unwrap();
        let key_ref = KeyRef {
            key_id: Some("k1".to_string()),
            key_spec: None,
        };
        assert!(matches!(
            storage.store_secret("s", b"x", &[key_ref]).await,
            Err(SecretStorageError::MissingKeySpec(id)) if id == "k1"
        ));
    }

    #[tokio::test]
    async fn test_reserved_names() {
        let storage = storage();
        let k1 = storage.generate_key("k1", "a", None).await.unwrap();
        for name in ["m.secret_storage.default_key", "m.secret_storage.key.k1"] {
            assert!(matches!(
                storage
                    .store_secret(name, b"x", &[KeyRef::new("k1", k1.key_spec.clone())])
                    .await,
                Err(SecretStorageError::ReservedName(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_store_secret_merges_per_key() {
        let storage = storage();
        let k1 = storage.generate_key("k1", "a", None).await.unwrap();
        let k2 = storage.generate_key("k2", "b", None).await.unwrap();

        storage
            .store_secret("s", b"one", &[KeyRef::new("k1", k1.key_spec.clone())])
            .await
            .unwrap();
        storage
            .store_secret("s", b"two", &[KeyRef::new("k2", k2.key_spec.clone())])
            .await
            .unwrap();

        let k1_plain = storage.get_secret("s", Some("k1"), &k1.key_spec).await.unwrap();
        let k2_plain = storage.get_secret("s", Some("k2"), &k2.key_spec).await.unwrap();
        assert_eq!(k1_plain.as_slice(), b"one");
        assert_eq!(k2_plain.as_slice(), b"two");

        // overwriting one entry leaves the other alone
        storage
            .store_secret("s", b"three", &[KeyRef::new("k1", k1.key_spec.clone())])
            .await
            .unwrap();
        let k1_plain = storage.get_secret("s", Some("k1"), &k1.key_spec).await.unwrap();
        let k2_plain = storage.get_secret("s", Some("k2"), &k2.key_spec).await.unwrap();
        assert_eq!(k1_plain.as_slice(), b"three");
        assert_eq!(k2_plain.as_slice(), b"two");

        let mut ids: Vec<String> = storage
            .get_algorithms_for_secret("s")
            .await
            .unwrap()
            .iter()
            .map(|r| r.key_id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_get_secret_not_found() {
        let storage = storage();
        let k1 = storage.generate_key("k1", "a", None).await.unwrap();
        assert!(matches!(
            storage.get_secret("nope", Some("k1"), &k1.key_spec).await,
            Err(SecretStorageError::SecretNotFound { name, key_id }) if name == "nope" && key_id == "k1"
        ));
        assert!(matches!(
            storage.get_secret("nope", Some("k9"), &k1.key_spec).await,
            Err(SecretStorageError::KeyNotFound(_))
        ));
        assert!(storage.get_algorithms_for_secret("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_key_pointer() {
        let storage = storage();
        assert!(matches!(
            storage.get_default_key().await,
            Err(SecretStorageError::NoDefaultKey)
        ));

        let k1 = storage.generate_key("k1", "a", None).await.unwrap();
        storage.set_default_key("k1").await.unwrap();

        // KeyRef without an id goes to the default key
        storage
            .store_secret("s", b"x", &[KeyRef::default_key(k1.key_spec.clone())])
            .await
            .unwrap();
        let plain = storage.get_secret("s", None, &k1.key_spec).await.unwrap();
        assert_eq!(plain.as_slice(), b"x");
    }

    #[tokio::test]
    async fn test_check_key() {
        let storage = storage();
        let k1 = storage.generate_key("k1", "a", None).await.unwrap();
        assert!(storage.check_key("k1", &k1.key_spec).await.unwrap());
        assert!(!storage
            .check_key("k1", &KeySpec::from([0u8; 32]))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_key_ids() {
        let storage = storage();
        storage.generate_key("k1", "a", None).await.unwrap();
        storage.generate_key("k2", "b", None).await.unwrap();
        storage.set_default_key("k2").await.unwrap();
        assert_eq!(storage.key_ids().await.unwrap(), vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_passphrase_not_available_for_random_key() {
        let storage = storage();
        storage.generate_key("k1", "a", None).await.unwrap();
        assert!(matches!(
            storage.key_spec_from_passphrase("k1", "pw", None, None).await,
            Err(SecretStorageError::NoPassphrase(_))
        ));
    }
}

//! Shared test utilities for secret storage integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::account_data::MemoryAccountDataStore;
use common::crypto::{PublicKey, SecretKey};
use common::storage::{SecretStorage, SecretStorageConfig};
use common::trust::{Ed25519Signer, Ed25519TrustOracle, TrustPolicy};

pub const USER_ID: &str = "@alice:example.org";

/// Keep passphrase tests fast; determinism does not depend on the count
pub const TEST_ITERATIONS: u32 = 2_000;

pub struct TestEnv {
    pub storage: SecretStorage<MemoryAccountDataStore>,
    pub store: MemoryAccountDataStore,
    pub signer: Ed25519Signer,
    pub signer_key: PublicKey,
}

/// Set up a storage service over a fresh memory store, trusting one signer
pub fn setup_test_env() -> TestEnv {
    let secret_key = SecretKey::generate().unwrap();
    let signer_key = secret_key.public();
    let signer = Ed25519Signer::new(USER_ID, secret_key);

    let store = MemoryAccountDataStore::new();
    let storage = storage_over(&store, signer_key);

    TestEnv {
        storage,
        store,
        signer,
        signer_key,
    }
}

/// A second device's view of the same account: its own service instance over
///  the same store, trusting the same signer
pub fn second_device(env: &TestEnv) -> SecretStorage<MemoryAccountDataStore> {
    storage_over(&env.store, env.signer_key)
}

fn storage_over(
    store: &MemoryAccountDataStore,
    trusted: PublicKey,
) -> SecretStorage<MemoryAccountDataStore> {
    let oracle = Ed25519TrustOracle::new().with_trusted_key(USER_ID, trusted);
    SecretStorage::new(store.clone(), Arc::new(oracle)).with_config(SecretStorageConfig {
        pbkdf2_iterations: TEST_ITERATIONS,
        trust_policy: TrustPolicy::default(),
    })
}

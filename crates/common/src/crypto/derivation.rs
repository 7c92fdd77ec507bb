//! Passphrase key derivation
//!
//! Storage keys may be derived from a passphrase with PBKDF2-HMAC-SHA512. The
//! salt and iteration count are recorded in the key metadata so that any device
//! holding the passphrase can re-derive the identical key.
//!
//! The PBKDF2 loop is written out here rather than delegated to a one-shot
//! function so that it can report progress and observe cancellation between
//! rounds. A 256-bit output fits inside the first 512-bit PBKDF2 block, so only
//! one block is ever computed.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroize;

use super::key_spec::{KeySpec, KEY_SIZE};
use super::random::{RandomError, RandomSource};

/// Algorithm identifier recorded in key metadata
pub const PBKDF2_ALGORITHM: &str = "m.pbkdf2";
/// Iteration count used when the caller does not pin one
pub const DEFAULT_ITERATIONS: u32 = 500_000;
/// Number of characters in a generated salt
pub const SALT_LENGTH: usize = 32;
/// Bit length of the derived key
pub const DERIVED_KEY_BITS: u32 = (KEY_SIZE * 8) as u32;

/// Rounds between progress reports and cancellation checks
const PROGRESS_INTERVAL: u32 = 1_000;
const SALT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    #[error("passphrase must not be empty")]
    EmptyPassphrase,
    #[error("iteration count must be at least 1")]
    InvalidIterations,
    #[error("key derivation was cancelled")]
    Cancelled,
    #[error("key derivation worker failed: {0}")]
    Worker(String),
    #[error("random error: {0}")]
    Random(#[from] RandomError),
}

/// Observer for long running derivations
///
/// `on_progress` is called with the number of completed rounds and the total
/// number of rounds. The final call always reports `(total, total)`.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, progress: u32, total: u32);
}

impl<F> ProgressListener for F
where
    F: Fn(u32, u32) + Send + Sync,
{
    fn on_progress(&self, progress: u32, total: u32) {
        self(progress, total)
    }
}

/// Generate a random alphanumeric salt of `SALT_LENGTH` characters
pub fn generate_salt(rng: &dyn RandomSource) -> Result<String, RandomError> {
    // 248 is the largest multiple of 62 that fits in a byte; rejecting
    //  anything above it keeps the distribution uniform
    let limit = (256 / SALT_ALPHABET.len() * SALT_ALPHABET.len()) as u8;
    let mut salt = String::with_capacity(SALT_LENGTH);
    let mut buf = [0u8; SALT_LENGTH];
    while salt.len() < SALT_LENGTH {
        rng.fill_bytes(&mut buf)?;
        for byte in buf.iter().copied().filter(|b| *b < limit) {
            if salt.len() == SALT_LENGTH {
                break;
            }
            salt.push(SALT_ALPHABET[byte as usize % SALT_ALPHABET.len()] as char);
        }
    }
    Ok(salt)
}

/// Derive a [`KeySpec`] from a passphrase on the calling thread
///
/// Deterministic in `(passphrase, salt, iterations)`. If `cancel` fires the
/// loop stops at the next check and no key material is returned.
///
/// # Errors
///
/// Returns an error if:
/// - The passphrase is empty
/// - `iterations` is zero
/// - The derivation was cancelled
pub fn derive_key_blocking(
    passphrase: &str,
    salt: &str,
    iterations: u32,
    progress: Option<&dyn ProgressListener>,
    cancel: Option<&CancellationToken>,
) -> Result<KeySpec, DerivationError> {
    if passphrase.is_empty() {
        return Err(DerivationError::EmptyPassphrase);
    }
    if iterations == 0 {
        return Err(DerivationError::InvalidIterations);
    }

    let is_cancelled = || cancel.map(|c| c.is_cancelled()).unwrap_or(false);
    if is_cancelled() {
        return Err(DerivationError::Cancelled);
    }

    // hmac accepts keys of any length
    let prf = <HmacSha512 as Mac>::new_from_slice(passphrase.as_bytes())
        .map_err(|e| DerivationError::Worker(e.to_string()))?;

    // U_1 = PRF(P, S || INT(1))
    let mut mac = prf.clone();
    mac.update(salt.as_bytes());
    mac.update(&1u32.to_be_bytes());
    let mut u = mac.finalize().into_bytes();
    let mut t = u.clone();

    for round in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&u);
        u.as_mut_slice().zeroize();
        u = mac.finalize().into_bytes();
        for (acc, byte) in t.iter_mut().zip(u.iter()) {
            *acc ^= byte;
        }

        if round % PROGRESS_INTERVAL == 0 {
            if is_cancelled() {
                u.as_mut_slice().zeroize();
                t.as_mut_slice().zeroize();
                return Err(DerivationError::Cancelled);
            }
            if let Some(listener) = progress {
                listener.on_progress(round, iterations);
            }
        }
    }

    let spec = KeySpec::from_slice(&t[..KEY_SIZE]);
    u.as_mut_slice().zeroize();
    t.as_mut_slice().zeroize();

    if let Some(listener) = progress {
        listener.on_progress(iterations, iterations);
    }

    spec.map_err(|e| DerivationError::Worker(e.to_string()))
}

/// Derive a [`KeySpec`] from a passphrase on the blocking worker pool
///
/// Same contract as [`derive_key_blocking`]; the caller's task is never blocked.
pub async fn derive_key(
    passphrase: &str,
    salt: &str,
    iterations: u32,
    progress: Option<Arc<dyn ProgressListener>>,
    cancel: Option<CancellationToken>,
) -> Result<KeySpec, DerivationError> {
    let passphrase = zeroize::Zeroizing::new(passphrase.to_string());
    let salt = salt.to_string();

    tokio::task::spawn_blocking(move || {
        derive_key_blocking(
            &passphrase,
            &salt,
            iterations,
            progress.as_deref(),
            cancel.as_ref(),
        )
    })
    .await
    .map_err(|e| DerivationError::Worker(e.to_string()))?
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::OsRandom;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_known_vector() {
        // PBKDF2-HMAC-SHA512("password", "salt", 1), first 32 bytes
        let spec = derive_key_blocking("password", "salt", 1, None, None).unwrap();
        assert_eq!(
            hex::encode(spec.as_bytes()),
            "867f70cf1ade02cff3752599a3a53dc4af34c7a669815ae5d513554e1c8cf252"
        );
    }

    #[test]
    fn test_matches_reference_pbkdf2() {
        for iterations in [1u32, 2, 999, 1_000, 1_001, 4_321] {
            let spec =
                derive_key_blocking("correct horse", "somesalt", iterations, None, None).unwrap();
            let mut expected = [0u8; KEY_SIZE];
            pbkdf2::pbkdf2_hmac::<Sha512>(
                b"correct horse",
                b"somesalt",
                iterations,
                &mut expected,
            );
            assert_eq!(spec.as_bytes(), &expected, "iterations = {}", iterations);
        }
    }

    #[test]
    fn test_deterministic() {
        let a = derive_key_blocking("correct horse", "S", 100_000, None, None).unwrap();
        let b = derive_key_blocking("correct horse", "S", 100_000, None, None).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_inputs_change_output() {
        let base = derive_key_blocking("pass", "salt", 10, None, None).unwrap();
        let other_pass = derive_key_blocking("pass2", "salt", 10, None, None).unwrap();
        let other_salt = derive_key_blocking("pass", "salt2", 10, None, None).unwrap();
        let other_iter = derive_key_blocking("pass", "salt", 11, None, None).unwrap();
        assert_ne!(base.as_bytes(), other_pass.as_bytes());
        assert_ne!(base.as_bytes(), other_salt.as_bytes());
        assert_ne!(base.as_bytes(), other_iter.as_bytes());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(matches!(
            derive_key_blocking("", "salt", 10, None, None),
            Err(DerivationError::EmptyPassphrase)
        ));
        assert!(matches!(
            derive_key_blocking("pass", "salt", 0, None, None),
            Err(DerivationError::InvalidIterations)
        ));
    }

    #[test]
    fn test_progress_reported() {
        let calls = AtomicU32::new(0);
        let last = AtomicU32::new(0);
        let listener = |progress: u32, total: u32| {
            assert!(progress <= total);
            calls.fetch_add(1, Ordering::SeqCst);
            last.store(progress, Ordering::SeqCst);
        };
        derive_key_blocking("pass", "salt", 5_000, Some(&listener), None).unwrap();
        // four intermediate reports plus the final one
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(last.load(Ordering::SeqCst), 5_000);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let result = derive_key_blocking("pass", "salt", 10, None, Some(&token));
        assert!(matches!(result, Err(DerivationError::Cancelled)));
    }

    #[test]
    fn test_cancelled_mid_derivation() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let listener = move |progress: u32, _total: u32| {
            if progress >= 2_000 {
                trigger.cancel();
            }
        };
        let result = derive_key_blocking("pass", "salt", 1_000_000, Some(&listener), Some(&token));
        assert!(matches!(result, Err(DerivationError::Cancelled)));
    }

    #[tokio::test]
    async fn test_async_derive_matches_blocking() {
        let blocking = derive_key_blocking("pass", "salt", 2_000, None, None).unwrap();
        let spawned = derive_key("pass", "salt", 2_000, None, None).await.unwrap();
        assert_eq!(blocking.as_bytes(), spawned.as_bytes());
    }

    #[test]
    fn test_generate_salt() {
        let a = generate_salt(&OsRandom).unwrap();
        let b = generate_salt(&OsRandom).unwrap();
        assert_eq!(a.len(), SALT_LENGTH);
        assert!(a.bytes().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}

//! `m.secret_storage.v1.aes-hmac-sha2` secret encryption
//!
//! Encrypted format (all fields unpadded base64):
//!
//! ```text
//! { "iv": 16 bytes, "ciphertext": AES-256-CTR(plaintext), "mac": HMAC-SHA256(ciphertext) }
//! ```

use aes::cipher::{KeyIvInit, StreamCipher};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::encoding::{base64_decode, base64_encode};
use super::key_spec::KeySpec;
use super::random::{RandomError, RandomSource};

/// Algorithm identifier for AES-CTR + HMAC-SHA256 secret storage keys
pub const SSSS_ALGORITHM_AES_HMAC_SHA2: &str = "m.secret_storage.v1.aes-hmac-sha2";
/// Size of the AES-CTR initialisation vector in bytes
pub const IV_SIZE: usize = 16;
/// Size of the HMAC-SHA256 tag in bytes
pub const MAC_SIZE: usize = 32;

const SUBKEY_SIZE: usize = 32;
const HKDF_SALT: [u8; 32] = [0; 32];
/// Key checks encrypt this many zero bytes under the empty name
const KEY_CHECK_SIZE: usize = 32;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur during secret encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// Wrong key, tampered ciphertext, or an undecodable field. These are
    ///  deliberately not told apart.
    #[error("authentication failed")]
    AuthenticationFailure,
    #[error("key expansion failed")]
    KeyExpansion,
    #[error("random error: {0}")]
    Random(#[from] RandomError),
}

/// A secret encrypted under one storage key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    pub iv: String,
    pub ciphertext: String,
    pub mac: String,
}

struct SubKeys {
    aes: Zeroizing<[u8; SUBKEY_SIZE]>,
    mac: Zeroizing<[u8; SUBKEY_SIZE]>,
}

/// Expand the storage key into an AES key and a MAC key bound to `name`
fn derive_subkeys(key: &KeySpec, name: &str) -> Result<SubKeys, CipherError> {
    let hk = Hkdf::<Sha256>::new(Some(&HKDF_SALT[..]), key.as_bytes());
    let mut okm = Zeroizing::new([0u8; SUBKEY_SIZE * 2]);
    hk.expand(name.as_bytes(), okm.as_mut_slice())
        .map_err(|_| CipherError::KeyExpansion)?;

    let mut keys = SubKeys {
        aes: Zeroizing::new([0u8; SUBKEY_SIZE]),
        mac: Zeroizing::new([0u8; SUBKEY_SIZE]),
    };
    keys.aes.copy_from_slice(&okm[..SUBKEY_SIZE]);
    keys.mac.copy_from_slice(&okm[SUBKEY_SIZE..]);
    Ok(keys)
}

fn apply_keystream(keys: &SubKeys, iv: &[u8; IV_SIZE], data: &mut [u8]) -> Result<(), CipherError> {
    let mut cipher = Aes256Ctr::new_from_slices(keys.aes.as_slice(), iv)
        .map_err(|_| CipherError::KeyExpansion)?;
    cipher.apply_keystream(data);
    Ok(())
}

fn mac_for(keys: &SubKeys, ciphertext: &[u8]) -> Result<HmacSha256, CipherError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(keys.mac.as_slice())
        .map_err(|_| CipherError::KeyExpansion)?;
    mac.update(ciphertext);
    Ok(mac)
}

fn decode_iv(iv: &str) -> Result<[u8; IV_SIZE], CipherError> {
    let bytes = base64_decode(iv).map_err(|_| CipherError::AuthenticationFailure)?;
    bytes
        .try_into()
        .map_err(|_| CipherError::AuthenticationFailure)
}

fn encrypt_with_iv(
    key: &KeySpec,
    name: &str,
    plaintext: &[u8],
    iv: [u8; IV_SIZE],
) -> Result<EncryptedSecret, CipherError> {
    let keys = derive_subkeys(key, name)?;

    let mut ciphertext = plaintext.to_vec();
    apply_keystream(&keys, &iv, &mut ciphertext)?;
    let tag = mac_for(&keys, &ciphertext)?.finalize().into_bytes();

    Ok(EncryptedSecret {
        iv: base64_encode(iv),
        ciphertext: base64_encode(&ciphertext),
        mac: base64_encode(tag),
    })
}

/// Encrypt a secret under `key`, binding it to the secret's `name`
///
/// A fresh random IV is drawn for every call, so encrypting the same plaintext
/// twice yields different ciphertexts.
///
/// # Errors
///
/// Returns an error only if the random source fails.
pub fn encrypt(
    key: &KeySpec,
    name: &str,
    plaintext: &[u8],
    rng: &dyn RandomSource,
) -> Result<EncryptedSecret, CipherError> {
    let mut iv = [0u8; IV_SIZE];
    rng.fill_bytes(&mut iv)?;
    // clear bit 63 so the 64-bit counter half cannot wrap
    iv[8] &= 0x7f;
    encrypt_with_iv(key, name, plaintext, iv)
}

/// Decrypt a secret previously encrypted under `key` for `name`
///
/// The MAC is checked (in constant time) before any decryption takes place.
///
/// # Errors
///
/// Returns [`CipherError::AuthenticationFailure`] if the key is wrong, the
/// name does not match, or any field was corrupted.
pub fn decrypt(
    key: &KeySpec,
    name: &str,
    encrypted: &EncryptedSecret,
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let iv = decode_iv(&encrypted.iv)?;
    let ciphertext =
        base64_decode(&encrypted.ciphertext).map_err(|_| CipherError::AuthenticationFailure)?;
    let tag = base64_decode(&encrypted.mac).map_err(|_| CipherError::AuthenticationFailure)?;

    let keys = derive_subkeys(key, name)?;
    mac_for(&keys, &ciphertext)?
        .verify_slice(&tag)
        .map_err(|_| CipherError::AuthenticationFailure)?;

    let mut plaintext = Zeroizing::new(ciphertext);
    apply_keystream(&keys, &iv, &mut plaintext)?;
    Ok(plaintext)
}

/// Produce the `(iv, mac)` key check stored alongside key metadata
///
/// Any client can later confirm that a candidate key is the right one without
/// touching a real secret.
pub fn compute_key_check(
    key: &KeySpec,
    rng: &dyn RandomSource,
) -> Result<EncryptedSecret, CipherError> {
    encrypt(key, "", &[0u8; KEY_CHECK_SIZE], rng)
}

/// Check `key` against a stored key check
///
/// Returns `Ok(false)` for a wrong key and for an undecodable check.
pub fn verify_key_check(key: &KeySpec, iv: &str, mac: &str) -> Result<bool, CipherError> {
    let Ok(iv) = decode_iv(iv) else {
        return Ok(false);
    };
    let Ok(tag) = base64_decode(mac) else {
        return Ok(false);
    };

    let keys = derive_subkeys(key, "")?;
    let mut ciphertext = [0u8; KEY_CHECK_SIZE];
    apply_keystream(&keys, &iv, &mut ciphertext)?;
    Ok(mac_for(&keys, &ciphertext)?.verify_slice(&tag).is_ok())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::OsRandom;

    fn key(byte: u8) -> KeySpec {
        KeySpec::from([byte; 32])
    }

    #[test]
    fn test_encrypt_decrypt() {
        let k = key(1);
        let encrypted = encrypt(&k, "m.cross_signing.master", b"deadbeef", &OsRandom).unwrap();
        let decrypted = decrypt(&k, "m.cross_signing.master", &encrypted).unwrap();
        assert_eq!(decrypted.as_slice(), b"deadbeef");
    }

    #[test]
    fn test_empty_plaintext() {
        let k = key(1);
        let encrypted = encrypt(&k, "name", b"", &OsRandom).unwrap();
        assert_eq!(encrypted.ciphertext, "");
        assert!(decrypt(&k, "name", &encrypted).unwrap().is_empty());
    }

    #[test]
    fn test_encryption_is_randomized() {
        let k = key(1);
        let a = encrypt(&k, "name", b"same plaintext", &OsRandom).unwrap();
        let b = encrypt(&k, "name", b"same plaintext", &OsRandom).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_iv_bit_63_cleared() {
        let k = key(1);
        for _ in 0..32 {
            let encrypted = encrypt(&k, "name", b"x", &OsRandom).unwrap();
            let iv = base64_decode(&encrypted.iv).unwrap();
            assert_eq!(iv.len(), IV_SIZE);
            assert_eq!(iv[8] & 0x80, 0);
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = encrypt(&key(1), "name", b"deadbeef", &OsRandom).unwrap();
        assert!(matches!(
            decrypt(&key(2), "name", &encrypted),
            Err(CipherError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_name_is_bound() {
        let k = key(1);
        let encrypted = encrypt(&k, "m.secret.a", b"deadbeef", &OsRandom).unwrap();
        assert!(matches!(
            decrypt(&k, "m.secret.b", &encrypted),
            Err(CipherError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let k = key(3);
        let encrypted = encrypt(&k, "name", b"a secret worth keeping", &OsRandom).unwrap();
        let ciphertext = base64_decode(&encrypted.ciphertext).unwrap();
        let tag = base64_decode(&encrypted.mac).unwrap();

        for i in 0..ciphertext.len() * 8 {
            let mut tampered = ciphertext.clone();
            tampered[i / 8] ^= 1 << (i % 8);
            let candidate = EncryptedSecret {
                ciphertext: base64_encode(&tampered),
                ..encrypted.clone()
            };
            assert!(matches!(
                decrypt(&k, "name", &candidate),
                Err(CipherError::AuthenticationFailure)
            ));
        }

        for i in 0..tag.len() * 8 {
            let mut tampered = tag.clone();
            tampered[i / 8] ^= 1 << (i % 8);
            let candidate = EncryptedSecret {
                mac: base64_encode(&tampered),
                ..encrypted.clone()
            };
            assert!(matches!(
                decrypt(&k, "name", &candidate),
                Err(CipherError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn test_malformed_fields_fail_authentication() {
        let k = key(1);
        let encrypted = encrypt(&k, "name", b"deadbeef", &OsRandom).unwrap();
        let short_iv = EncryptedSecret {
            iv: base64_encode([0u8; 8]),
            ..encrypted.clone()
        };
        let garbage = EncryptedSecret {
            ciphertext: "!!!".to_string(),
            ..encrypted
        };
        assert!(matches!(
            decrypt(&k, "name", &short_iv),
            Err(CipherError::AuthenticationFailure)
        ));
        assert!(matches!(
            decrypt(&k, "name", &garbage),
            Err(CipherError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_key_check() {
        let k = key(4);
        let check = compute_key_check(&k, &OsRandom).unwrap();
        assert!(verify_key_check(&k, &check.iv, &check.mac).unwrap());
        assert!(!verify_key_check(&key(5), &check.iv, &check.mac).unwrap());
        assert!(!verify_key_check(&k, "not base64!", &check.mac).unwrap());
    }
}

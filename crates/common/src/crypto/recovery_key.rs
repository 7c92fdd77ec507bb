//! Recovery key encoding
//!
//! A recovery key is the raw storage key rendered for a human to write down:
//!
//! ```text
//! [ 0x8B 0x01 ][ key: 32 bytes ][ parity: 1 byte ]
//! ```
//!
//! The parity byte is the XOR of every preceding byte. The 35 bytes are base58
//! encoded (Bitcoin alphabet) and split into space separated groups of four
//! characters. Decoding ignores all whitespace.

use zeroize::{Zeroize, Zeroizing};

use super::key_spec::KEY_SIZE;

/// Two byte header identifying a secret storage recovery key
pub const RECOVERY_KEY_PREFIX: [u8; 2] = [0x8B, 0x01];
/// Total decoded size: prefix || key || parity
pub const RECOVERY_KEY_SIZE: usize = RECOVERY_KEY_PREFIX.len() + KEY_SIZE + 1;
/// Characters per space separated group
const GROUP_SIZE: usize = 4;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecoveryKeyError {
    #[error("recovery key is not valid base58")]
    InvalidEncoding,
    #[error("invalid recovery key size, expected {RECOVERY_KEY_SIZE}, got {0}")]
    InvalidLength(usize),
    #[error("recovery key has an unknown prefix")]
    InvalidPrefix,
    #[error("recovery key parity check failed")]
    InvalidParity,
}

/// Encode raw key material as a recovery key
pub fn encode_recovery_key(key: &[u8; KEY_SIZE]) -> String {
    let mut buf = Zeroizing::new(Vec::with_capacity(RECOVERY_KEY_SIZE));
    buf.extend_from_slice(&RECOVERY_KEY_PREFIX);
    buf.extend_from_slice(key);
    let parity = buf.iter().fold(0u8, |acc, b| acc ^ b);
    buf.push(parity);

    let mut encoded = bs58::encode(buf.as_slice()).into_string();
    let grouped = encoded
        .as_bytes()
        .chunks(GROUP_SIZE)
        // base58 output is pure ascii
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    encoded.zeroize();
    grouped
}

/// Decode a recovery key back into raw key material
///
/// # Errors
///
/// Returns an error if:
/// - The key is not base58
/// - The decoded length is not `RECOVERY_KEY_SIZE`
/// - The prefix is not `RECOVERY_KEY_PREFIX`
/// - The parity byte does not match
pub fn decode_recovery_key(
    recovery_key: &str,
) -> Result<Zeroizing<[u8; KEY_SIZE]>, RecoveryKeyError> {
    let compact: Zeroizing<String> = Zeroizing::new(
        recovery_key
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
    );

    let decoded = Zeroizing::new(
        bs58::decode(compact.as_str())
            .into_vec()
            .map_err(|_| RecoveryKeyError::InvalidEncoding)?,
    );

    if decoded.len() != RECOVERY_KEY_SIZE {
        return Err(RecoveryKeyError::InvalidLength(decoded.len()));
    }
    if decoded[..RECOVERY_KEY_PREFIX.len()] != RECOVERY_KEY_PREFIX {
        return Err(RecoveryKeyError::InvalidPrefix);
    }
    // xor over everything including the parity byte must cancel out
    if decoded.iter().fold(0u8, |acc, b| acc ^ b) != 0 {
        return Err(RecoveryKeyError::InvalidParity);
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&decoded[RECOVERY_KEY_PREFIX.len()..RECOVERY_KEY_PREFIX.len() + KEY_SIZE]);
    Ok(key)
}

#[cfg(test)]
mod test {
    use super::*;

    fn with_parity(mut bytes: Vec<u8>) -> Vec<u8> {
        let parity = bytes.iter().fold(0u8, |acc, b| acc ^ b);
        bytes.push(parity);
        bytes
    }

    #[test]
    fn test_roundtrip() {
        let key = [0x42u8; KEY_SIZE];
        let encoded = encode_recovery_key(&key);
        let decoded = decode_recovery_key(&encoded).unwrap();
        assert_eq!(*decoded, key);
    }

    #[test]
    fn test_grouping() {
        let encoded = encode_recovery_key(&[9u8; KEY_SIZE]);
        let groups: Vec<&str> = encoded.split(' ').collect();
        assert!(groups.len() > 1);
        for group in &groups[..groups.len() - 1] {
            assert_eq!(group.len(), GROUP_SIZE);
        }
        assert!(encoded.starts_with('E'));
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let key = [7u8; KEY_SIZE];
        let encoded = encode_recovery_key(&key);
        let compact: String = encoded.split_whitespace().collect();
        let noisy = format!("  {}\n", encoded.replace(' ', "\t "));

        assert_eq!(*decode_recovery_key(&compact).unwrap(), key);
        assert_eq!(*decode_recovery_key(&noisy).unwrap(), key);
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let mut bytes = vec![0x8B, 0x02];
        bytes.extend_from_slice(&[1u8; KEY_SIZE]);
        let encoded = bs58::encode(with_parity(bytes)).into_string();
        assert_eq!(
            decode_recovery_key(&encoded),
            Err(RecoveryKeyError::InvalidPrefix)
        );
    }

    #[test]
    fn test_rejects_bad_parity() {
        let mut bytes = RECOVERY_KEY_PREFIX.to_vec();
        bytes.extend_from_slice(&[1u8; KEY_SIZE]);
        let mut bytes = with_parity(bytes);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let encoded = bs58::encode(bytes).into_string();
        assert_eq!(
            decode_recovery_key(&encoded),
            Err(RecoveryKeyError::InvalidParity)
        );
    }

    #[test]
    fn test_rejects_bad_length() {
        let encoded = bs58::encode([0x8Bu8, 0x01, 0x8A]).into_string();
        assert_eq!(
            decode_recovery_key(&encoded),
            Err(RecoveryKeyError::InvalidLength(3))
        );
    }

    #[test]
    fn test_rejects_non_base58() {
        assert_eq!(
            decode_recovery_key("0OIl"),
            Err(RecoveryKeyError::InvalidEncoding)
        );
    }
}

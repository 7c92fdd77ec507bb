/// Errors raised by a [`RandomSource`]
#[derive(Debug, thiserror::Error)]
pub enum RandomError {
    #[error("random source failure: {0}")]
    Unavailable(String),
}

/// Cryptographically secure random bytes
///
/// Used for raw key generation, passphrase salts and cipher IVs. The storage
/// service takes one of these by injection so that embedders can route
/// randomness through their own platform source.
pub trait RandomSource: Send + Sync + std::fmt::Debug {
    /// Fill `dest` entirely with random bytes
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), RandomError>;
}

/// Operating system CSPRNG via `getrandom`
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), RandomError> {
        getrandom::getrandom(dest).map_err(|e| RandomError::Unavailable(e.to_string()))
    }
}

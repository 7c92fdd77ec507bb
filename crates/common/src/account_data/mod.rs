mod memory;
mod provider;

pub use memory::{MemoryAccountDataStore, MemoryAccountDataStoreError};
pub use provider::{AccountDataError, AccountDataStore};

//! Storage trait definitions.

use crate::StorageResult;

/// Trait for secure storage backends (OS keychain, secret service, memory).
pub trait SecureStorage: Send + Sync {
    /// Store a value securely
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

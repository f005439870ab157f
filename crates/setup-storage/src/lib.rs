//! Durable storage for the GateFlow setup flow.
//!
//! Two single-slot stores live here:
//! - [`SessionStateStore`] holds at most one pending device-login session
//!   between invocations.
//! - [`TokenStore`] holds the long-lived platform bearer token.
//!
//! Both ship a file backend (owner-only, atomic replace) and a backend on top
//! of the [`SecureStorage`] trait so an OS keychain can be plugged in without
//! touching callers.

mod file_ops;
mod keys;
mod memory;
mod session;
mod token;
mod traits;

pub use file_ops::{read_trimmed, remove_if_exists, write_owner_only};
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use session::{FileSessionStore, PendingSession, SecureSessionStore, SessionStateStore};
pub use token::{BearerToken, FileTokenStore, SecureTokenStore, TokenStore};
pub use traits::SecureStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Stored data could not be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Path has no parent directory or file name
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

//! Bearer token storage.

use crate::file_ops::{read_trimmed, remove_if_exists, write_owner_only};
use crate::{SecureStorage, StorageKeys, StorageResult};
use setup_config_and_utils::Paths;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Platform bearer token. The value is zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(Zeroizing<String>);

impl BearerToken {
    /// Wrap a raw token, trimming surrounding whitespace.
    pub fn new(value: impl Into<String>) -> Self {
        let value: String = value.into();
        Self(Zeroizing::new(value.trim().to_string()))
    }

    /// The raw token, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Durable storage for the single current bearer token.
pub trait TokenStore: Send + Sync {
    /// Persist the token, replacing any previous value.
    fn save(&self, token: &BearerToken) -> StorageResult<()>;

    /// Load the current token, if any.
    fn load(&self) -> StorageResult<Option<BearerToken>>;

    /// Remove the token. Returns whether one was stored.
    fn clear(&self) -> StorageResult<bool>;
}

/// Token store backed by the Supabase CLI's token file.
///
/// The file is shared with the Supabase CLI, so a token minted by either tool
/// is usable by both.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the standard location (`~/.config/supabase/access_token`).
    pub fn from_paths(paths: &Paths) -> Self {
        Self::new(paths.access_token_file())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &BearerToken) -> StorageResult<()> {
        write_owner_only(&self.path, token.expose())?;
        tracing::info!(path = %self.path.display(), "access token stored");
        Ok(())
    }

    fn load(&self) -> StorageResult<Option<BearerToken>> {
        Ok(read_trimmed(&self.path)?.map(BearerToken::new))
    }

    fn clear(&self) -> StorageResult<bool> {
        remove_if_exists(&self.path)
    }
}

/// Token store on top of a [`SecureStorage`] backend.
pub struct SecureTokenStore {
    storage: Box<dyn SecureStorage>,
}

impl SecureTokenStore {
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }
}

impl TokenStore for SecureTokenStore {
    fn save(&self, token: &BearerToken) -> StorageResult<()> {
        self.storage
            .set(StorageKeys::SUPABASE_ACCESS_TOKEN, token.expose())
    }

    fn load(&self) -> StorageResult<Option<BearerToken>> {
        Ok(self
            .storage
            .get(StorageKeys::SUPABASE_ACCESS_TOKEN)?
            .map(BearerToken::new)
            .filter(|token| !token.is_empty()))
    }

    fn clear(&self) -> StorageResult<bool> {
        self.storage.delete(StorageKeys::SUPABASE_ACCESS_TOKEN)
    }
}

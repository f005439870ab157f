//! Pending device-login session storage.
//!
//! At most one session exists per installation. Saving replaces whatever was
//! there before, so a second `start` makes the first session unresolvable.

use crate::file_ops::{read_trimmed, remove_if_exists, write_owner_only};
use crate::{SecureStorage, StorageError, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use setup_config_and_utils::Paths;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// One pending device-login session.
///
/// The private key is kept hex-encoded in a zeroize-on-drop buffer and is
/// redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingSession {
    pub session_id: String,
    pub private_key_hex: Zeroizing<String>,
    pub public_key_hex: String,
    pub token_label: String,
}

impl fmt::Debug for PendingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSession")
            .field("session_id", &self.session_id)
            .field("private_key_hex", &"[REDACTED]")
            .field("public_key_hex", &self.public_key_hex)
            .field("token_label", &self.token_label)
            .finish()
    }
}

/// On-disk shape of the session file.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecordRef<'a> {
    session_id: &'a str,
    private_key: &'a str,
    public_key_hex: &'a str,
    token_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    session_id: String,
    private_key: String,
    public_key_hex: String,
    token_name: String,
}

impl PendingSession {
    fn to_json(&self) -> StorageResult<Zeroizing<String>> {
        let record = SessionRecordRef {
            session_id: &self.session_id,
            private_key: &self.private_key_hex,
            public_key_hex: &self.public_key_hex,
            token_name: &self.token_label,
        };
        Ok(Zeroizing::new(serde_json::to_string_pretty(&record)?))
    }

    fn from_json(raw: &str) -> StorageResult<Self> {
        let record: SessionRecord = serde_json::from_str(raw)?;
        if record.session_id.trim().is_empty() || record.private_key.trim().is_empty() {
            return Err(StorageError::Encoding(
                "session record is missing required fields".to_string(),
            ));
        }
        Ok(Self {
            session_id: record.session_id,
            private_key_hex: Zeroizing::new(record.private_key),
            public_key_hex: record.public_key_hex,
            token_label: record.token_name,
        })
    }
}

/// Single-slot, durable store for the pending session.
pub trait SessionStateStore: Send + Sync {
    /// Persist a session, replacing any previous one.
    fn save(&self, session: &PendingSession) -> StorageResult<()>;

    /// Load the pending session, if any.
    fn load(&self) -> StorageResult<Option<PendingSession>>;

    /// Remove the pending session. Clearing an empty slot is not an error.
    fn clear(&self) -> StorageResult<()>;

    /// Check whether a session is pending.
    fn exists(&self) -> StorageResult<bool> {
        Ok(self.load()?.is_some())
    }
}

/// Session store backed by an owner-only JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the standard location (`~/.config/gateflow/.setup-state.json`).
    pub fn from_paths(paths: &Paths) -> Self {
        Self::new(paths.session_state_file())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SessionStateStore for FileSessionStore {
    fn save(&self, session: &PendingSession) -> StorageResult<()> {
        let json = session.to_json()?;
        write_owner_only(&self.path, &json)?;
        tracing::debug!(session_id = %session.session_id, "pending session saved");
        Ok(())
    }

    fn load(&self) -> StorageResult<Option<PendingSession>> {
        match read_trimmed(&self.path)? {
            Some(raw) => {
                let raw = Zeroizing::new(raw);
                PendingSession::from_json(&raw).map(Some)
            }
            None => Ok(None),
        }
    }

    fn clear(&self) -> StorageResult<()> {
        if remove_if_exists(&self.path)? {
            tracing::debug!("pending session cleared");
        }
        Ok(())
    }

    fn exists(&self) -> StorageResult<bool> {
        Ok(self.path.exists())
    }
}

/// Session store on top of a [`SecureStorage`] backend.
pub struct SecureSessionStore {
    storage: Box<dyn SecureStorage>,
}

impl SecureSessionStore {
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }
}

impl SessionStateStore for SecureSessionStore {
    fn save(&self, session: &PendingSession) -> StorageResult<()> {
        let json = session.to_json()?;
        self.storage.set(StorageKeys::PENDING_SESSION, &json)
    }

    fn load(&self) -> StorageResult<Option<PendingSession>> {
        match self.storage.get(StorageKeys::PENDING_SESSION)? {
            Some(raw) => {
                let raw = Zeroizing::new(raw);
                PendingSession::from_json(&raw).map(Some)
            }
            None => Ok(None),
        }
    }

    fn clear(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::PENDING_SESSION)?;
        Ok(())
    }
}

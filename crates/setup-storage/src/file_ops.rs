//! Owner-only file helpers shared by the file backends.

use crate::{StorageError, StorageResult};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Permission bits for every file this crate writes.
#[cfg(unix)]
const OWNER_ONLY_MODE: u32 = 0o600;

/// Atomically replace `path` with `content`, readable by the owner only.
///
/// The content is written to a sibling temp file created with mode 0600,
/// synced, then renamed over the target. Readers see either the old file or
/// the new one, never a partial write. Parent directories are created.
pub fn write_owner_only(path: &Path, content: &str) -> StorageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;

    fs::create_dir_all(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));

    let write_result = (|| -> Result<(), io::Error> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(OWNER_ONLY_MODE);
        }

        let mut file = options.open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, path)?;

        if let Ok(parent_dir) = fs::File::open(dir) {
            let _ = parent_dir.sync_all();
        }
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    Ok(())
}

/// Read a file and trim surrounding whitespace. Missing or blank files are `None`.
pub fn read_trimmed(path: &Path) -> StorageResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Remove a file. Returns whether anything was deleted.
pub fn remove_if_exists(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("file.env");

        write_owner_only(&path, "KEY=\"value\"\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "KEY=\"value\"\n");
    }

    #[test]
    fn test_write_replaces_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file");

        write_owner_only(&path, "first").unwrap();
        write_owner_only(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file");
        write_owner_only(&path, "content").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("secret");
        write_owner_only(&path, "content").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_tightens_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_owner_only(&path, "new").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_read_trimmed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");

        assert_eq!(read_trimmed(&path).unwrap(), None);

        fs::write(&path, "  sbp_abc \n").unwrap();
        assert_eq!(read_trimmed(&path).unwrap().as_deref(), Some("sbp_abc"));

        fs::write(&path, "\n \n").unwrap();
        assert_eq!(read_trimmed(&path).unwrap(), None);
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file");

        assert!(!remove_if_exists(&path).unwrap());
        fs::write(&path, "x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}

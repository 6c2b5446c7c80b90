//! Safe file removal using the trash crate.
//!
//! # Overview
//!
//! - Move to system trash (default, recoverable)
//! - Permanent deletion (explicit opt-in)
//! - TOCTOU verification: a file is only removed if its size and mtime still
//!   match what the index recorded
//!
//! # Example
//!
//! ```no_run
//! use treetidy::actions::delete::{remove_verified, FileSnapshot};
//! use std::path::Path;
//!
//! let path = Path::new("/path/to/duplicate.txt");
//! let snapshot = FileSnapshot::capture(path).unwrap();
//! match remove_verified(&snapshot, false) {
//!     Ok(size) => println!("Moved {} bytes to trash", size),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::ActionError;
use crate::scanner::FileRecord;

/// File metadata snapshot for TOCTOU verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Snapshot the state the index recorded for `record`.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            mtime: Some(record.modified),
        }
    }

    /// Create a snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, ActionError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| ActionError::from_io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Verify that the file on disk still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Modified`] if the file changed, or an I/O
    /// classification if it vanished or can't be accessed.
    pub fn verify(&self) -> Result<(), ActionError> {
        let current = Self::capture(&self.path)?;

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(ActionError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(ActionError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Move a single file to the system trash, returning its size.
///
/// # Errors
///
/// - `NotFound` / `PermissionDenied` if the file can't be inspected
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<u64, ActionError> {
    let size = fs::symlink_metadata(path)
        .map_err(|e| ActionError::from_io(path, e))?
        .len();

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        ActionError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
    Ok(size)
}

/// Permanently delete a single file, returning its size.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` / `PermissionDenied` if the file can't be inspected
/// - `Io` if removal fails
pub fn permanent_delete(path: &Path) -> Result<u64, ActionError> {
    let size = fs::symlink_metadata(path)
        .map_err(|e| ActionError::from_io(path, e))?
        .len();

    fs::remove_file(path).map_err(|e| {
        log::error!("Permanent delete failed for {}: {}", path.display(), e);
        ActionError::from_io(path, e)
    })?;

    log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
    Ok(size)
}

/// Remove a file after verifying it still matches `expected`.
///
/// # Errors
///
/// - `Modified` if the file changed since it was indexed
/// - Errors from [`delete_to_trash`] or [`permanent_delete`]
pub fn remove_verified(expected: &FileSnapshot, permanent: bool) -> Result<u64, ActionError> {
    expected.verify()?;

    if permanent {
        permanent_delete(&expected.path)
    } else {
        delete_to_trash(&expected.path)
    }
}

/// Fail unless `keeper` still exists as a regular file.
///
/// # Errors
///
/// Returns [`ActionError::KeeperMissing`].
pub fn ensure_keeper(keeper: &Path) -> Result<(), ActionError> {
    match fs::symlink_metadata(keeper) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ActionError::KeeperMissing(keeper.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ActionError::KeeperMissing(keeper.to_path_buf()))
        }
        Err(e) => Err(ActionError::from_io(keeper, e)),
    }
}

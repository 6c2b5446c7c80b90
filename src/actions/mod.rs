//! Live-mode file actions.
//!
//! This module provides functionality for:
//! - Safe removal via the trash crate, or permanently on request
//! - Relocation of misplaced files without overwriting
//! - Ordered execution of an [`ActionLog`](crate::plan::ActionLog)
//!
//! Nothing here decides *what* to do; the planner already did. Every
//! mutation re-checks the file against the index first, so a file that
//! changed after it was scanned is left alone.
//!
//! ```no_run
//! use treetidy::actions::delete::{remove_verified, FileSnapshot};
//! use std::path::Path;
//!
//! let snapshot = FileSnapshot::capture(Path::new("/path/to/copy.c")).unwrap();
//! let result = remove_verified(&snapshot, false);
//! ```

pub mod delete;
pub mod executor;
pub mod relocate;

use std::io;
use std::path::{Path, PathBuf};

pub use delete::{delete_to_trash, permanent_delete, remove_verified, FileSnapshot};
pub use executor::{ApplySummary, Executor};
pub use relocate::move_verified;

/// Errors that can occur while applying an action.
#[derive(thiserror::Error, Debug)]
pub enum ActionError {
    /// The file does not exist.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The file changed after it was indexed.
    #[error("File modified since scan: {0}")]
    Modified(PathBuf),

    /// The retained copy a REMOVE depends on is gone.
    #[error("Keeper no longer exists: {0}")]
    KeeperMissing(PathBuf),

    /// A MOVE target is already occupied.
    #[error("Target already exists: {0}")]
    TargetExists(PathBuf),

    /// The trash operation failed.
    #[error("Failed to move to trash: {path}: {message}")]
    TrashFailed {
        /// Path to the file
        path: PathBuf,
        /// Error message from the trash crate
        message: String,
    },

    /// The action is malformed (e.g. a MOVE without a target).
    #[error("Invalid action for {path}: {message}")]
    Invalid {
        /// File the action applies to
        path: PathBuf,
        /// What is missing
        message: String,
    },

    /// Any other I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path to the file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    /// Classify an I/O error against `path`.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

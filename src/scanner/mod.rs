//! Scanner module: directory traversal, hashing and the file inventory.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk (symlinks are never followed)
//! - Streaming BLAKE3 content hashing with a bounded text sample
//! - Parallel indexing into [`FileRecord`]s, optionally reusing hashes from a
//!   previous report
//! - Unicode path normalization for root-relative paths
//!
//! # Architecture
//!
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming) and sampling
//! - [`indexer`]: Bounded worker pool turning walked files into records
//! - [`path_utils`]: NFC normalization and relative path strings
//!
//! # Example
//!
//! ```no_run
//! use treetidy::scanner::{Indexer, IndexerConfig};
//! use std::path::Path;
//!
//! let indexer = Indexer::new(IndexerConfig::default());
//! let index = indexer.index(Path::new(".")).unwrap();
//! for record in &index.records {
//!     println!("{}: {} bytes", record.relative_path, record.size);
//! }
//! ```

pub mod hasher;
pub mod indexer;
pub mod path_utils;
pub mod walker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

pub use hasher::{hash_to_hex, hex_to_hash, Hash, Hasher, DEFAULT_SAMPLE_BYTES};
pub use indexer::{Index, IndexStats, Indexer, IndexerConfig};
pub use walker::{WalkedFile, Walker};

/// Inventory record for one indexed file.
///
/// Created once by the indexer and never mutated afterwards; every later
/// stage borrows records read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Root-relative path, `/`-separated and NFC normalized
    pub relative_path: String,
    /// File size in bytes
    pub size: u64,
    /// BLAKE3 digest of the full content, `None` if the file could not be read
    pub content_hash: Option<Hash>,
    /// Bounded prefix of the content decoded as text, `None` for binary or unreadable files
    pub sample_text: Option<String>,
    /// Last modification time
    pub modified: SystemTime,
    /// Error message when hashing or sampling failed
    pub unreadable: Option<String>,
}

impl FileRecord {
    /// Create a readable record without a sample.
    #[must_use]
    pub fn new(
        path: PathBuf,
        relative_path: impl Into<String>,
        size: u64,
        content_hash: Hash,
        modified: SystemTime,
    ) -> Self {
        Self {
            path,
            relative_path: relative_path.into(),
            size,
            content_hash: Some(content_hash),
            sample_text: None,
            modified,
            unreadable: None,
        }
    }

    /// Create a record for a file whose content could not be read.
    #[must_use]
    pub fn unreadable(
        path: PathBuf,
        relative_path: impl Into<String>,
        size: u64,
        modified: SystemTime,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path,
            relative_path: relative_path.into(),
            size,
            content_hash: None,
            sample_text: None,
            modified,
            unreadable: Some(reason.into()),
        }
    }

    /// Attach a text sample.
    #[must_use]
    pub fn with_sample(mut self, sample: Option<String>) -> Self {
        self.sample_text = sample;
        self
    }

    /// Whether the content was hashed successfully.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.content_hash.is_some()
    }

    /// The final path component as a string.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Hash as hexadecimal string, if present.
    #[must_use]
    pub fn hash_hex(&self) -> Option<String> {
        self.content_hash.as_ref().map(hash_to_hex)
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Glob patterns to exclude (gitignore-style).
    /// These are applied in addition to a `.gitignore` at the root.
    pub exclude_patterns: Vec<String>,
}

impl WalkerConfig {
    /// Create a new walker configuration.
    #[must_use]
    pub fn new(skip_hidden: bool, exclude_patterns: Vec<String>) -> Self {
        Self {
            skip_hidden,
            exclude_patterns,
        }
    }
}

/// Errors that can occur during directory scanning.
///
/// These are collected in the index stats; none of them aborts a scan.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path disappeared between listing and inspection.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The scan root exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file or directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl ScanError {
    /// Path associated with this error.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::PermissionDenied(p)
            | Self::NotFound(p)
            | Self::NotADirectory(p)
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Hashing was abandoned because shutdown was requested.
    #[error("Interrupted while hashing {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl HashError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(error),
            },
        }
    }
}

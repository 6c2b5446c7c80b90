//! Hash reuse from a previously emitted report.
//!
//! A report's `files` inventory records every file's path, size, mtime and
//! hash. Passing that report back in lets the indexer skip re-hashing files
//! that have not changed since.
//!
//! # Cache Invalidation
//!
//! An entry is used only if both of these still match the file on disk:
//! * File size
//! * Modification time (mtime, full precision)
//!
//! The cache is an optimization only. A missing, corrupt or stale cache
//! falls back to hashing; results are identical either way.

pub mod entry;

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::scanner::Hash;

pub use entry::CacheEntry;

/// Errors that can occur while loading a cache report.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The report could not be read.
    #[error("failed to read cache report {path}: {source}")]
    Read {
        /// Report path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The report is not valid JSON or lacks an inventory.
    #[error("failed to parse cache report {path}: {source}")]
    Parse {
        /// Report path
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Only the inventory is needed from a report.
#[derive(Deserialize)]
struct InventoryOnly {
    files: Vec<CacheEntry>,
}

/// Read-only hash lookup built from a previous report.
#[derive(Debug, Default, Clone)]
pub struct HashCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl HashCache {
    /// Build a cache from inventory entries.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = CacheEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|e| e.hash.is_some())
                .map(|e| (e.path.clone(), e))
                .collect(),
        }
    }

    /// Load the inventory of a JSON report written by a previous run.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file cannot be read or parsed.
    pub fn from_report_file(path: &Path) -> CacheResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let report: InventoryOnly =
            serde_json::from_str(&content).map_err(|source| CacheError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let cache = Self::from_entries(report.files);
        log::debug!(
            "Loaded {} cached hashes from {}",
            cache.len(),
            path.display()
        );
        Ok(cache)
    }

    /// Look up a still-fresh hash for `path`.
    #[must_use]
    pub fn lookup(&self, path: &Path, size: u64, modified: SystemTime) -> Option<Hash> {
        self.entries
            .get(path)
            .filter(|e| e.is_fresh(size, modified))
            .and_then(CacheEntry::content_hash)
    }

    /// Number of usable entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

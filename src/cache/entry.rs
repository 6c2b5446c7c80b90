//! Inventory entries: the per-file rows a report carries and a later run reuses.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::scanner::{hash_to_hex, hex_to_hash, FileRecord, Hash};

/// One inventory row of a report.
///
/// Written for every indexed file; read back by [`super::HashCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Absolute path of the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Modification time at index time
    pub modified: SystemTime,
    /// BLAKE3 hash as hex, absent for unreadable files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Read error for unreadable files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreadable: Option<String>,
}

impl CacheEntry {
    /// Parsed content hash, if present and well-formed.
    #[must_use]
    pub fn content_hash(&self) -> Option<Hash> {
        self.hash.as_deref().and_then(hex_to_hash)
    }

    /// Whether this entry still describes a file with the given size and mtime.
    #[must_use]
    pub fn is_fresh(&self, size: u64, modified: SystemTime) -> bool {
        self.size == size && self.modified == modified
    }
}

impl From<&FileRecord> for CacheEntry {
    fn from(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            modified: record.modified,
            hash: record.content_hash.as_ref().map(hash_to_hex),
            unreadable: record.unreadable.clone(),
        }
    }
}

//! Exact-duplicate grouping and size bucketing.
//!
//! # Overview
//!
//! [`group_by_hash`] partitions hashed records by content hash. Groups are
//! deterministic for a given record order: members keep input order, groups
//! are ordered by their first member's path and numbered `dup-1`, `dup-2`,
//! and so on. Zero-byte files share the BLAKE3 empty digest and group like
//! any other content.
//!
//! [`bucket_by_size`] is the cheap pre-filter the similarity detector uses:
//! files of different size are never compared.
//!
//! # Example
//!
//! ```
//! use treetidy::scanner::FileRecord;
//! use treetidy::duplicates::group_by_hash;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let records = vec![
//!     FileRecord::new(PathBuf::from("/r/a.c"), "a.c", 4, [1; 32], SystemTime::UNIX_EPOCH),
//!     FileRecord::new(PathBuf::from("/r/b.c"), "b.c", 4, [1; 32], SystemTime::UNIX_EPOCH),
//!     FileRecord::new(PathBuf::from("/r/c.c"), "c.c", 4, [2; 32], SystemTime::UNIX_EPOCH),
//! ];
//!
//! let (groups, stats) = group_by_hash(&records);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].id, "dup-1");
//! assert_eq!(stats.duplicate_files, 2);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::scanner::{hash_to_hex, FileRecord, Hash};

/// Files sharing identical content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Stable identifier, `dup-<n>`
    pub id: String,
    /// BLAKE3 hash shared by every member
    #[serde(with = "crate::scanner::hasher::hex_serde")]
    pub hash: Hash,
    /// Size in bytes shared by every member
    pub size: u64,
    /// Member paths in discovery order
    pub members: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Bytes freed by keeping a single copy.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size * (self.members.len() as u64).saturating_sub(1)
    }

    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hash_to_hex(&self.hash)
    }

    /// Whether `path` is a member.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.members.iter().any(|m| m == path)
    }
}

/// Statistics from hash grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Records with a content hash
    pub hashed_files: usize,
    /// Records skipped because they were unreadable
    pub skipped_unreadable: usize,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Files that belong to some group
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_bytes: u64,
}

/// Group records by content hash.
///
/// Unreadable records are ignored. Only groups of two or more members are
/// returned.
#[must_use]
pub fn group_by_hash(records: &[FileRecord]) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut stats = GroupingStats::default();
    let mut slots: HashMap<Hash, usize> = HashMap::new();
    let mut buckets: Vec<(Hash, u64, Vec<PathBuf>)> = Vec::new();

    for record in records {
        let Some(hash) = record.content_hash else {
            stats.skipped_unreadable += 1;
            continue;
        };
        stats.hashed_files += 1;

        match slots.get(&hash) {
            Some(&slot) => buckets[slot].2.push(record.path.clone()),
            None => {
                slots.insert(hash, buckets.len());
                buckets.push((hash, record.size, vec![record.path.clone()]));
            }
        }
    }

    let mut groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .filter(|(_, _, members)| members.len() > 1)
        .map(|(hash, size, members)| DuplicateGroup {
            id: String::new(),
            hash,
            size,
            members,
        })
        .collect();
    groups.sort_by(|a, b| a.members[0].cmp(&b.members[0]));

    for (n, group) in groups.iter_mut().enumerate() {
        group.id = format!("dup-{}", n + 1);
        stats.duplicate_groups += 1;
        stats.duplicate_files += group.len();
        stats.reclaimable_bytes += group.reclaimable_bytes();
        log::debug!(
            "{}: {} copies of {} bytes ({})",
            group.id,
            group.len(),
            group.size,
            group.hash_hex()
        );
    }

    log::info!(
        "Grouped {} hashed files into {} duplicate groups ({} files)",
        stats.hashed_files,
        stats.duplicate_groups,
        stats.duplicate_files
    );

    (groups, stats)
}

/// Bucket records by size, keeping only buckets with two or more members.
///
/// Buckets come back in ascending size order; members keep input order.
#[must_use]
pub fn bucket_by_size<'a>(
    records: impl IntoIterator<Item = &'a FileRecord>,
) -> BTreeMap<u64, Vec<&'a FileRecord>> {
    let mut buckets: BTreeMap<u64, Vec<&'a FileRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(record.size).or_default().push(record);
    }
    buckets.retain(|size, members| {
        if members.len() > 1 {
            true
        } else {
            log::trace!("Unique size {}: {}", size, members[0].path.display());
            false
        }
    });
    buckets
}

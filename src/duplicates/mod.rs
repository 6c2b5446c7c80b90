//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Exact-duplicate grouping by content hash
//! - Size bucketing
//! - Near-duplicate scoring within equal-size buckets

pub mod groups;
pub mod similarity;

pub use groups::{bucket_by_size, group_by_hash, DuplicateGroup, GroupingStats};
pub use similarity::{
    similarity_ratio, SimilarPair, SimilarityConfig, SimilarityDetector, SimilarityResult,
    DEFAULT_MAX_SIMILARITY_PAIRS, DEFAULT_SIMILARITY_THRESHOLD,
};

//! Near-duplicate detection within equal-size buckets.
//!
//! Two files are near-duplicates when their text samples share most of their
//! lines. The ratio is `2·M / (|A| + |B|)` over line tokens, where `M` is the
//! total length of the matching blocks found by repeatedly taking the longest
//! common run and recursing on both sides of it.
//!
//! Pair enumeration is quadratic per bucket, so the number of candidate
//! comparisons is capped. Enumeration is sequential and deterministic;
//! only ratio computation runs on the worker pool.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::groups::bucket_by_size;
use crate::progress::ProgressCallback;
use crate::scanner::indexer::{run_on_io_pool, DEFAULT_IO_THREADS};
use crate::scanner::FileRecord;

/// Default minimum ratio for a pair to be reported.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Default cap on candidate comparisons.
pub const DEFAULT_MAX_SIMILARITY_PAIRS: usize = 1000;

/// Two equal-size files with different content but similar text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPair {
    /// Path that sorts first
    pub file_a: PathBuf,
    /// Path that sorts second
    pub file_b: PathBuf,
    /// Similarity ratio in `[0, 1]`
    pub ratio: f64,
    /// Shared size in bytes
    pub size: u64,
}

/// Output of a similarity pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityResult {
    /// Pairs at or above the threshold, in candidate order
    pub pairs: Vec<SimilarPair>,
    /// Candidate comparisons actually made
    pub comparisons: usize,
    /// Whether candidates were left unexamined because of the cap
    pub truncated: bool,
}

/// Configuration for the similarity detector.
#[derive(Clone)]
pub struct SimilarityConfig {
    /// Minimum ratio for a pair to be reported.
    pub threshold: f64,
    /// Maximum number of candidate comparisons.
    pub max_pairs: usize,
    /// Worker threads for ratio computation.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl fmt::Debug for SimilarityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityConfig")
            .field("threshold", &self.threshold)
            .field("max_pairs", &self.max_pairs)
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_pairs: DEFAULT_MAX_SIMILARITY_PAIRS,
            io_threads: DEFAULT_IO_THREADS,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl SimilarityConfig {
    /// Set the reporting threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the comparison cap.
    #[must_use]
    pub fn with_max_pairs(mut self, max_pairs: usize) -> Self {
        self.max_pairs = max_pairs;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Finds near-duplicate pairs among indexed records.
#[derive(Debug, Default)]
pub struct SimilarityDetector {
    config: SimilarityConfig,
}

impl SimilarityDetector {
    /// Create a detector.
    #[must_use]
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    /// Score candidate pairs among `records`.
    ///
    /// Only readable records with a text sample take part. Pairs with equal
    /// hashes are exact duplicates and are not candidates.
    #[must_use]
    pub fn detect(&self, records: &[FileRecord]) -> SimilarityResult {
        let (candidates, truncated) = self.candidates(records);
        if truncated {
            log::warn!(
                "Similarity search truncated at {} comparisons",
                self.config.max_pairs
            );
        }

        let callback = self.config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_phase_start("similarity", candidates.len());
        }

        let done = AtomicUsize::new(0);
        let config = &self.config;
        let ratios: Vec<Option<f64>> = run_on_io_pool(config.io_threads, || {
            candidates
                .par_iter()
                .map(|(a, b)| {
                    if config.is_shutdown_requested() {
                        return None;
                    }
                    let ratio = sample_ratio(a, b);
                    if let Some(cb) = callback {
                        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                        cb.on_progress(n, &a.relative_path);
                    }
                    Some(ratio)
                })
                .collect()
        });

        let pairs: Vec<SimilarPair> = candidates
            .iter()
            .zip(&ratios)
            .filter_map(|((a, b), ratio)| {
                let ratio = (*ratio)?;
                if ratio < config.threshold {
                    return None;
                }
                log::debug!(
                    "Similar ({:.3}): {} ~ {}",
                    ratio,
                    a.relative_path,
                    b.relative_path
                );
                Some(SimilarPair {
                    file_a: a.path.clone(),
                    file_b: b.path.clone(),
                    ratio,
                    size: a.size,
                })
            })
            .collect();

        if let Some(cb) = callback {
            cb.on_phase_end("similarity");
        }

        let comparisons = ratios.iter().filter(|r| r.is_some()).count();
        log::info!(
            "Similarity: {} comparisons, {} pairs at >= {:.2}",
            comparisons,
            pairs.len(),
            config.threshold
        );

        SimilarityResult {
            pairs,
            comparisons,
            truncated,
        }
    }

    /// Enumerate candidate pairs in bucket order, `a` before `b` by path.
    fn candidates<'a>(
        &self,
        records: &'a [FileRecord],
    ) -> (Vec<(&'a FileRecord, &'a FileRecord)>, bool) {
        let eligible = records
            .iter()
            .filter(|r| r.is_readable() && r.sample_text.is_some());
        let buckets = bucket_by_size(eligible);
        if self.config.max_pairs == 0 {
            // Nothing may be compared, so any bucket at all is left unexamined.
            return (Vec::new(), !buckets.is_empty());
        }

        let mut candidates = Vec::new();
        for members in buckets.values() {
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    if a.content_hash == b.content_hash {
                        continue;
                    }
                    if candidates.len() >= self.config.max_pairs {
                        return (candidates, true);
                    }
                    let pair = if a.path <= b.path { (*a, *b) } else { (*b, *a) };
                    candidates.push(pair);
                }
            }
        }
        (candidates, false)
    }
}

fn sample_ratio(a: &FileRecord, b: &FileRecord) -> f64 {
    let a = a.sample_text.as_deref().unwrap_or_default();
    let b = b.sample_text.as_deref().unwrap_or_default();
    similarity_ratio(a, b)
}

/// Line-based similarity of two texts in `[0, 1]`.
///
/// Lines keep their terminators, so a missing final newline counts as a
/// difference. Two empty texts are identical. When `b` has 200 or more
/// lines, lines occurring in more than 1% of it (plus one) only extend
/// matches found on other lines and never seed one.
///
/// # Example
///
/// ```
/// use treetidy::duplicates::similarity_ratio;
///
/// assert_eq!(similarity_ratio("a\nb\n", "a\nb\n"), 1.0);
/// assert_eq!(similarity_ratio("a\nb\n", "a\nc\n"), 0.5);
/// assert_eq!(similarity_ratio("", ""), 1.0);
/// ```
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<&str> = a.split_inclusive('\n').collect();
    let b: Vec<&str> = b.split_inclusive('\n').collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_len(&a, &b) as f64 / total as f64
}

/// `b` lengths at which popular lines stop seeding matches.
const AUTOJUNK_MIN_LINES: usize = 200;

/// Total length of the matching blocks between `a` and `b`.
fn matching_len(a: &[&str], b: &[&str]) -> usize {
    let mut b2j: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, line) in b.iter().enumerate() {
        b2j.entry(*line).or_default().push(j);
    }
    if b.len() >= AUTOJUNK_MIN_LINES {
        let limit = b.len() / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= limit);
    }

    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, k)` with `a[i..i+k] == b[j..j+k]`; ties go to the
/// earliest `i`, then the earliest `j`. The best run over indexed lines is
/// then widened over equal neighbours, which covers popular lines left out
/// of `b2j`.
fn longest_match(
    a: &[&str],
    b: &[&str],
    b2j: &HashMap<&str, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // Run length ending at b[j] for the previous a line.
    let mut runs: HashMap<usize, usize> = HashMap::new();

    for (i, line) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(line) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| runs.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        runs = next;
    }

    while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_k += 1;
    }
    while best_i + best_k < ahi
        && best_j + best_k < bhi
        && a[best_i + best_k] == b[best_j + best_k]
    {
        best_k += 1;
    }
    (best_i, best_j, best_k)
}

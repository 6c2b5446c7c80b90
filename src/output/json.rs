//! The JSON report: everything one run found and decided.
//!
//! A report doubles as input to later runs. Its `files` inventory is a hash
//! cache for `--cache-report`, and its `actions` are the reviewed plan that
//! `apply --preflight` must reproduce.
//!
//! # Output Schema (abridged)
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00Z",
//!   "root": "/src/tree",
//!   "mode": "dry-run",
//!   "status": "success",
//!   "interrupted": false,
//!   "summary": { "total_files": 3, "duplicate_groups": 1, "...": "..." },
//!   "files": [{ "path": "/src/tree/a.c", "size": 7, "modified": "...", "hash": "af13..." }],
//!   "duplicate_groups": [{ "id": "dup-1", "hash": "af13...", "size": 7, "members": ["..."] }],
//!   "similar_pairs": [],
//!   "violations": [],
//!   "actions": [{ "seq": 0, "kind": "keep", "source": "...", "reason": "keeper (score 12)",
//!                 "group_id": "dup-1", "outcome": { "status": "planned" } }]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cache::CacheEntry;
use crate::config::Mode;
use crate::duplicates::{DuplicateGroup, SimilarPair};
use crate::error::{ExitCode, RunStatus};
use crate::plan::{Action, ActionCounts};
use crate::policy::Violation;

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Regular files indexed
    pub total_files: usize,
    /// Sum of their sizes
    pub total_bytes: u64,
    /// Files whose content could not be read
    pub unreadable_files: usize,
    /// Exact-duplicate groups
    pub duplicate_groups: usize,
    /// Files belonging to some group
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_bytes: u64,
    /// Near-duplicate pairs at or above the threshold
    pub similar_pairs: usize,
    /// Candidate comparisons made
    pub comparisons: usize,
    /// Whether the comparison cap left candidates unexamined
    pub similarity_truncated: bool,
    /// Misplaced-file violations
    pub misplaced: usize,
    /// Suspicious-name violations
    pub suspicious: usize,
    /// Actions by kind and outcome
    pub actions: ActionCounts,
    /// Bytes removed in live mode
    pub bytes_removed: u64,
    /// Bytes relocated in live mode
    pub bytes_moved: u64,
    /// Hashes reused from a previous report
    pub cache_hits: usize,
    /// Hashes computed from disk
    pub cache_misses: usize,
    /// Directory-level walk errors
    pub scan_errors: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Complete output of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Canonical scan root
    pub root: PathBuf,
    /// Dry-run or live
    pub mode: Mode,
    /// Overall outcome
    pub status: RunStatus,
    /// Whether a live run stopped early on Ctrl+C
    #[serde(default)]
    pub interrupted: bool,
    /// Counters
    pub summary: ReportSummary,
    /// Inventory of every indexed file
    pub files: Vec<CacheEntry>,
    /// Exact-duplicate groups
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Near-duplicate pairs
    pub similar_pairs: Vec<SimilarPair>,
    /// Policy violations
    pub violations: Vec<Violation>,
    /// Ordered action log
    pub actions: Vec<Action>,
    /// Walk errors, as messages
    #[serde(default)]
    pub scan_errors: Vec<String>,
}

impl Report {
    /// Exit code the CLI should return for this report.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::Interrupted
        } else {
            self.status.exit_code()
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write pretty JSON to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to_file(&self, path: &Path) -> Result<(), JsonOutputError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        self.write_to(&mut file, true)?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }

    /// Read a report back.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read_from_file(path: &Path) -> Result<Self, JsonOutputError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

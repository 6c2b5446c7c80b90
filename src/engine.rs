//! The engine: index, analyze, plan and (in live mode) apply.
//!
//! # Stages
//!
//! 1. Index the tree into sorted [`FileRecord`](crate::scanner::FileRecord)s
//! 2. Group exact duplicates by hash
//! 3. Score near-duplicates within equal-size buckets
//! 4. Classify paths against the layout policy
//! 5. Plan an ordered [`ActionLog`](crate::plan::ActionLog)
//! 6. Live only: verify the pre-flight, then apply
//!
//! The shutdown flag is checked between stages. An interrupted stage's
//! output is thrown away and the run fails with [`EngineError::Interrupted`].
//! Live application is the exception: once mutation has started it stops at
//! an action boundary and still returns a report, marked interrupted.
//!
//! # Example
//!
//! ```no_run
//! use treetidy::config::EngineConfig;
//! use treetidy::engine::Engine;
//! use std::path::Path;
//!
//! let engine = Engine::new(EngineConfig::default());
//! let report = engine.run(Path::new("./legacy-tree")).unwrap();
//! for action in &report.actions {
//!     println!("{} {}", action.kind, action.source.display());
//! }
//! ```

use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::actions::{ApplySummary, Executor};
use crate::cache::{CacheEntry, HashCache};
use crate::config::{ConfigError, EngineConfig, Mode};
use crate::duplicates::{group_by_hash, SimilarityDetector};
use crate::error::RunStatus;
use crate::output::json::{Report, ReportSummary};
use crate::plan::{Planner, Preflight, PreflightError};
use crate::policy::Category;
use crate::progress::ProgressCallback;
use crate::scanner::{Indexer, IndexerConfig, ScanError};

/// Errors that abort a run before a report exists.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The root could not be scanned.
    #[error("cannot scan root: {0}")]
    Root(#[from] ScanError),

    /// Live mode was requested without a reviewed plan.
    #[error("live mode requires a pre-flight report from a previous dry-run")]
    PreflightRequired,

    /// The fresh plan differs from the reviewed one.
    #[error(transparent)]
    Preflight(#[from] PreflightError),

    /// Shutdown was requested between stages.
    #[error("Run interrupted by user")]
    Interrupted,
}

/// Runs the full pipeline for one root.
pub struct Engine {
    config: EngineConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
    cache: Option<Arc<HashCache>>,
    preflight: Option<Preflight>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .field("progress", &self.progress.is_some())
            .field("cache", &self.cache.as_ref().map(|c| c.len()))
            .field("preflight", &self.preflight.as_ref().map(Preflight::len))
            .finish()
    }
}

impl Engine {
    /// Create an engine for `config`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
            progress: None,
            cache: None,
            preflight: None,
        }
    }

    /// Share a shutdown flag with every stage.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report stage progress.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Reuse hashes from a previous report.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<HashCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The reviewed plan a live run must reproduce.
    #[must_use]
    pub fn with_preflight(mut self, preflight: Preflight) -> Self {
        self.preflight = Some(preflight);
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn checkpoint(&self, stage: &str) -> Result<(), EngineError> {
        if self.is_shutdown_requested() {
            log::warn!("Interrupted after {}", stage);
            return Err(EngineError::Interrupted);
        }
        Ok(())
    }

    /// Run every stage against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for invalid configuration, an unusable root, a
    /// missing or mismatching pre-flight in live mode, or an interruption
    /// before mutation started. Per-file problems never fail a run; they are
    /// recorded in the report.
    pub fn run(&self, root: &Path) -> Result<Report, EngineError> {
        let started = Instant::now();

        self.config.validate()?;
        let policy = self
            .config
            .compile_policy()
            .map_err(ConfigError::from)?;
        let scorer = self
            .config
            .compile_scorer()
            .map_err(ConfigError::from)?;

        let live = self.config.mode == Mode::Live;
        if live && self.preflight.is_none() {
            return Err(EngineError::PreflightRequired);
        }

        log::info!("Starting {} run on {}", self.config.mode, root.display());

        // Index
        let mut indexer_config = IndexerConfig::default()
            .with_io_threads(self.config.io_threads)
            .with_sample_bytes(self.config.sample_bytes)
            .with_walker(self.config.walker_config());
        if let Some(ref flag) = self.shutdown_flag {
            indexer_config = indexer_config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref cb) = self.progress {
            indexer_config = indexer_config.with_progress_callback(Arc::clone(cb));
        }
        if let Some(ref cache) = self.cache {
            indexer_config = indexer_config.with_cache(Arc::clone(cache));
        }
        let index = Indexer::new(indexer_config).index(root)?;
        if index.stats.interrupted {
            return Err(EngineError::Interrupted);
        }
        self.checkpoint("indexing")?;

        // Exact duplicates
        let (groups, grouping) = group_by_hash(&index.records);
        self.checkpoint("grouping")?;

        // Near duplicates
        let mut similarity_config = self.config.similarity_config();
        if let Some(ref flag) = self.shutdown_flag {
            similarity_config = similarity_config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref cb) = self.progress {
            similarity_config = similarity_config.with_progress_callback(Arc::clone(cb));
        }
        let similarity = SimilarityDetector::new(similarity_config).detect(&index.records);
        self.checkpoint("similarity")?;

        // Policy
        let violations = policy.classify_all(&index.records);

        // Plan
        let planner = Planner::new(&index.root, &scorer, &self.config.protected_filenames);
        let mut log = planner.plan(&index.records, &groups, &similarity.pairs, &violations);
        self.checkpoint("planning")?;

        // Apply
        let mut applied = ApplySummary::default();
        if live {
            if let Some(ref preflight) = self.preflight {
                preflight.verify(&index.root, &log)?;
            }
            let mut executor = Executor::new(!self.config.use_trash);
            if let Some(ref flag) = self.shutdown_flag {
                executor = executor.with_shutdown_flag(Arc::clone(flag));
            }
            if let Some(ref cb) = self.progress {
                executor = executor.with_progress_callback(Arc::clone(cb));
            }
            applied = executor.apply(&mut log, &index.records);
        }

        let counts = log.counts();
        let status = if applied.interrupted {
            RunStatus::Failure
        } else if counts.failed > 0 {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        };

        let summary = ReportSummary {
            total_files: index.stats.total_files,
            total_bytes: index.stats.total_bytes,
            unreadable_files: index.stats.unreadable_files,
            duplicate_groups: grouping.duplicate_groups,
            duplicate_files: grouping.duplicate_files,
            reclaimable_bytes: grouping.reclaimable_bytes,
            similar_pairs: similarity.pairs.len(),
            comparisons: similarity.comparisons,
            similarity_truncated: similarity.truncated,
            misplaced: violations
                .iter()
                .filter(|v| v.category == Category::Misplaced)
                .count(),
            suspicious: violations
                .iter()
                .filter(|v| v.category == Category::Suspicious)
                .count(),
            actions: counts,
            bytes_removed: applied.bytes_removed,
            bytes_moved: applied.bytes_moved,
            cache_hits: index.stats.cache_hits,
            cache_misses: index.stats.cache_misses,
            scan_errors: index.stats.scan_errors.len(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        log::info!(
            "Run finished: {} files, {} groups, {} similar pairs, {} actions ({})",
            summary.total_files,
            summary.duplicate_groups,
            summary.similar_pairs,
            log.len(),
            status
        );

        Ok(Report {
            generated_at: Utc::now(),
            files: index.records.iter().map(CacheEntry::from).collect(),
            scan_errors: index
                .stats
                .scan_errors
                .iter()
                .map(ToString::to_string)
                .collect(),
            root: index.root,
            mode: self.config.mode,
            status,
            interrupted: applied.interrupted,
            summary,
            duplicate_groups: groups,
            similar_pairs: similarity.pairs,
            violations,
            actions: log.into_actions(),
        })
    }
}

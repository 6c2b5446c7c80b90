//! Ordered execution of a planned action log.
//!
//! Actions run strictly in log order. A failure never aborts the run; it
//! halts the rest of its own group (the duplicate group, similar pair or move
//! rule it belongs to) and everything else continues. Interruption stops at
//! the next action boundary and marks what is left as skipped.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::delete::{ensure_keeper, remove_verified, FileSnapshot};
use super::relocate::move_verified;
use super::ActionError;
use crate::plan::{Action, ActionKind, ActionLog, Outcome};
use crate::progress::ProgressCallback;
use crate::scanner::FileRecord;

/// Skip reason for actions left over after an interrupt.
pub const INTERRUPTED_REASON: &str = "interrupted";

/// Totals from one live run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Actions applied
    pub applied: usize,
    /// Actions that failed
    pub failed: usize,
    /// Actions skipped (halted group or interrupt)
    pub skipped: usize,
    /// Bytes removed by REMOVE actions
    pub bytes_removed: u64,
    /// Bytes relocated by MOVE actions
    pub bytes_moved: u64,
    /// Whether the run stopped early on a shutdown request
    pub interrupted: bool,
}

/// Applies an [`ActionLog`] to the filesystem.
pub struct Executor {
    permanent: bool,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("permanent", &self.permanent)
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Executor {
    /// Create an executor. Removals go to the trash unless `permanent`.
    #[must_use]
    pub fn new(permanent: bool) -> Self {
        Self {
            permanent,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Stop at the next action boundary once `flag` is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report per-action progress.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Apply every action in `log`, recording outcomes in place.
    ///
    /// `records` is the index the log was planned from; each mutation checks
    /// the file still matches its record.
    pub fn apply(&self, log: &mut ActionLog, records: &[FileRecord]) -> ApplySummary {
        let by_path: HashMap<&Path, &FileRecord> =
            records.iter().map(|r| (r.path.as_path(), r)).collect();
        let mut halted: HashSet<String> = HashSet::new();
        let mut summary = ApplySummary::default();

        if let Some(ref cb) = self.progress {
            cb.on_phase_start("applying", log.len());
        }

        for seq in 0..log.len() {
            if self.is_shutdown_requested() {
                log::warn!("Shutdown requested, skipping {} remaining actions", log.len() - seq);
                for rest in seq..log.len() {
                    log.set_outcome(
                        rest,
                        Outcome::Skipped {
                            reason: INTERRUPTED_REASON.to_string(),
                        },
                    );
                    summary.skipped += 1;
                }
                summary.interrupted = true;
                break;
            }

            let action = log.actions()[seq].clone();
            if let Some(ref cb) = self.progress {
                cb.on_progress(seq + 1, &action.source.to_string_lossy());
            }

            if halted.contains(&action.group_id) {
                log::debug!("Skipping action {} in halted group {}", seq, action.group_id);
                log.set_outcome(
                    seq,
                    Outcome::Skipped {
                        reason: format!("earlier action in {} failed", action.group_id),
                    },
                );
                summary.skipped += 1;
                continue;
            }

            match self.apply_one(&action, by_path.get(action.source.as_path()).copied()) {
                Ok(bytes) => {
                    match action.kind {
                        ActionKind::Remove => summary.bytes_removed += bytes,
                        ActionKind::Move => summary.bytes_moved += bytes,
                        ActionKind::Keep => {}
                    }
                    log.set_outcome(seq, Outcome::Applied);
                    summary.applied += 1;
                }
                Err(e) => {
                    log::error!("{} {} failed: {}", action.kind, action.source.display(), e);
                    log.set_outcome(
                        seq,
                        Outcome::Failed {
                            error: e.to_string(),
                        },
                    );
                    halted.insert(action.group_id.clone());
                    summary.failed += 1;
                }
            }
        }

        if let Some(ref cb) = self.progress {
            cb.on_phase_end("applying");
        }

        log::info!(
            "Applied {} actions ({} failed, {} skipped)",
            summary.applied,
            summary.failed,
            summary.skipped
        );
        summary
    }

    fn apply_one(&self, action: &Action, record: Option<&FileRecord>) -> Result<u64, ActionError> {
        if action.kind == ActionKind::Keep {
            return Ok(0);
        }

        let snapshot = match record {
            Some(record) => FileSnapshot::from_record(record),
            None => {
                return Err(ActionError::Invalid {
                    path: action.source.clone(),
                    message: "file is not in the index".to_string(),
                })
            }
        };

        match action.kind {
            ActionKind::Remove => {
                let keeper = action.keeper.as_deref().ok_or_else(|| ActionError::Invalid {
                    path: action.source.clone(),
                    message: "REMOVE without a keeper".to_string(),
                })?;
                ensure_keeper(keeper)?;
                remove_verified(&snapshot, self.permanent)
            }
            ActionKind::Move => {
                let target = action.target.as_deref().ok_or_else(|| ActionError::Invalid {
                    path: action.source.clone(),
                    message: "MOVE without a target".to_string(),
                })?;
                move_verified(&snapshot, target)
            }
            ActionKind::Keep => Ok(0),
        }
    }
}

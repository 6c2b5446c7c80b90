//! Planned actions and the append-only action log.
//!
//! Every decision the engine makes is an [`Action`]. Nothing touches the
//! filesystem before the [`ActionLog`] is complete; in live mode the executor
//! then walks the log in order and records each outcome in place.
//!
//! - [`planner`]: turns groups, pairs and violations into actions
//! - [`preflight`]: checks a live run against an earlier dry-run

pub mod planner;
pub mod preflight;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

pub use planner::Planner;
pub use preflight::{PlannedStep, Preflight, PreflightError};

/// What an action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Leave the file in place
    Keep,
    /// Delete the file (trash or permanent)
    Remove,
    /// Relocate the file
    Move,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "KEEP"),
            Self::Remove => write!(f, "REMOVE"),
            Self::Move => write!(f, "MOVE"),
        }
    }
}

/// What happened to an action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    /// Decided, not executed (dry-run, or live before execution)
    #[default]
    Planned,
    /// Executed successfully
    Applied,
    /// Execution failed
    Failed {
        /// Error message
        error: String,
    },
    /// Not executed
    Skipped {
        /// Why
        reason: String,
    },
}

impl Outcome {
    /// Whether this outcome is a failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One planned decision about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Position in the log, starting at 0
    pub seq: usize,
    /// Decision kind
    pub kind: ActionKind,
    /// File the action applies to
    pub source: PathBuf,
    /// Destination for MOVE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    /// File this REMOVE defers to; must still exist when applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keeper: Option<PathBuf>,
    /// Human-readable justification
    pub reason: String,
    /// Duplicate group, similar pair or move rule this action belongs to
    pub group_id: String,
    /// Execution result
    #[serde(default)]
    pub outcome: Outcome,
}

/// Per-kind action counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    /// KEEP actions
    pub keep: usize,
    /// REMOVE actions
    pub remove: usize,
    /// MOVE actions
    pub r#move: usize,
    /// Actions whose outcome is failed
    pub failed: usize,
    /// Actions whose outcome is skipped
    pub skipped: usize,
}

/// Ordered, append-only list of actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLog {
    actions: Vec<Action>,
    mutated: HashSet<PathBuf>,
    keepers: HashSet<PathBuf>,
    pinned: HashSet<PathBuf>,
}

impl ActionLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a KEEP.
    pub fn keep(&mut self, source: &Path, reason: impl Into<String>, group_id: &str) {
        self.push(ActionKind::Keep, source, None, None, reason.into(), group_id);
    }

    /// Append a KEEP that also pins `source`: no later pass may remove or
    /// move it.
    pub fn pin(&mut self, source: &Path, reason: impl Into<String>, group_id: &str) {
        debug_assert!(
            !self.mutated.contains(source),
            "pinning mutated {}",
            source.display()
        );
        self.pinned.insert(source.to_path_buf());
        self.keep(source, reason, group_id);
    }

    /// Append a REMOVE deferring to `keeper`.
    pub fn remove(
        &mut self,
        source: &Path,
        keeper: &Path,
        reason: impl Into<String>,
        group_id: &str,
    ) {
        self.keepers.insert(keeper.to_path_buf());
        self.push(
            ActionKind::Remove,
            source,
            None,
            Some(keeper.to_path_buf()),
            reason.into(),
            group_id,
        );
    }

    /// Append a MOVE.
    pub fn relocate(
        &mut self,
        source: &Path,
        target: &Path,
        reason: impl Into<String>,
        group_id: &str,
    ) {
        self.push(
            ActionKind::Move,
            source,
            Some(target.to_path_buf()),
            None,
            reason.into(),
            group_id,
        );
    }

    fn push(
        &mut self,
        kind: ActionKind,
        source: &Path,
        target: Option<PathBuf>,
        keeper: Option<PathBuf>,
        reason: String,
        group_id: &str,
    ) {
        if kind != ActionKind::Keep {
            debug_assert!(!self.pinned.contains(source), "{} is pinned", source.display());
            let fresh = self.mutated.insert(source.to_path_buf());
            debug_assert!(fresh, "second REMOVE/MOVE for {}", source.display());
        }
        log::debug!("{} {} ({}): {}", kind, source.display(), group_id, reason);
        self.actions.push(Action {
            seq: self.actions.len(),
            kind,
            source: source.to_path_buf(),
            target,
            keeper,
            reason,
            group_id: group_id.to_string(),
            outcome: Outcome::Planned,
        });
    }

    /// Whether `path` already has a REMOVE or MOVE.
    #[must_use]
    pub fn is_mutated(&self, path: &Path) -> bool {
        self.mutated.contains(path)
    }

    /// Whether `path` was kept as protected.
    #[must_use]
    pub fn is_pinned(&self, path: &Path) -> bool {
        self.pinned.contains(path)
    }

    /// Whether some REMOVE defers to `path`.
    #[must_use]
    pub fn is_keeper(&self, path: &Path) -> bool {
        self.keepers.contains(path)
    }

    /// Actions in log order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Record the outcome of action `seq`.
    ///
    /// Outcomes are the only part of a logged action that may change.
    pub fn set_outcome(&mut self, seq: usize, outcome: Outcome) {
        if let Some(action) = self.actions.get_mut(seq) {
            action.outcome = outcome;
        }
    }

    /// Counts by kind and outcome.
    #[must_use]
    pub fn counts(&self) -> ActionCounts {
        let mut counts = ActionCounts::default();
        for action in &self.actions {
            match action.kind {
                ActionKind::Keep => counts.keep += 1,
                ActionKind::Remove => counts.remove += 1,
                ActionKind::Move => counts.r#move += 1,
            }
            match action.outcome {
                Outcome::Failed { .. } => counts.failed += 1,
                Outcome::Skipped { .. } => counts.skipped += 1,
                Outcome::Planned | Outcome::Applied => {}
            }
        }
        counts
    }

    /// Consume the log.
    #[must_use]
    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}

//! Pre-flight validation for live runs.
//!
//! A live run never asks for confirmation. Instead it must be handed the
//! report of an earlier dry-run; the engine re-plans against the current tree
//! and refuses to touch anything unless the fresh plan is the one the caller
//! reviewed, step for step.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Action, ActionKind, ActionLog};

/// Errors from pre-flight loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    /// The pre-flight report could not be read.
    #[error("failed to read pre-flight report {path}: {source}")]
    Read {
        /// Report path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The pre-flight report is not a valid report.
    #[error("failed to parse pre-flight report {path}: {source}")]
    Parse {
        /// Report path
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The pre-flight report was produced for another root.
    #[error("pre-flight report is for {expected}, not {found}")]
    RootMismatch {
        /// Root recorded in the report
        expected: PathBuf,
        /// Root of this run
        found: PathBuf,
    },

    /// The fresh plan has a different number of steps.
    #[error("plan changed since pre-flight: {expected} actions reviewed, {found} planned now")]
    LengthMismatch {
        /// Reviewed step count
        expected: usize,
        /// Fresh step count
        found: usize,
    },

    /// A step differs from the reviewed plan.
    #[error("plan changed since pre-flight at action {seq}: reviewed {expected}, planned {found}")]
    StepMismatch {
        /// Position in the log
        seq: usize,
        /// Reviewed step
        expected: String,
        /// Fresh step
        found: String,
    },
}

/// The identity of one planned step: what is done to which file, and where to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlannedStep {
    /// Action kind
    pub kind: ActionKind,
    /// File acted on
    pub source: PathBuf,
    /// MOVE destination
    #[serde(default)]
    pub target: Option<PathBuf>,
}

impl From<&Action> for PlannedStep {
    fn from(action: &Action) -> Self {
        Self {
            kind: action.kind,
            source: action.source.clone(),
            target: action.target.clone(),
        }
    }
}

impl std::fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.source.display())?;
        if let Some(target) = &self.target {
            write!(f, " -> {}", target.display())?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct ReportActions {
    root: PathBuf,
    actions: Vec<PlannedStep>,
}

/// The reviewed plan a live run must reproduce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    root: PathBuf,
    steps: Vec<PlannedStep>,
}

impl Preflight {
    /// Build a pre-flight from reviewed actions.
    #[must_use]
    pub fn from_actions(root: &Path, actions: &[Action]) -> Self {
        Self {
            root: root.to_path_buf(),
            steps: actions.iter().map(PlannedStep::from).collect(),
        }
    }

    /// Load the root and action list of a JSON report.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Read`] or [`PreflightError::Parse`].
    pub fn from_report_file(path: &Path) -> Result<Self, PreflightError> {
        let content = fs::read_to_string(path).map_err(|source| PreflightError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let report: ReportActions =
            serde_json::from_str(&content).map_err(|source| PreflightError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!(
            "Loaded pre-flight with {} actions from {}",
            report.actions.len(),
            path.display()
        );
        Ok(Self {
            root: report.root,
            steps: report.actions,
        })
    }

    /// Number of reviewed steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps were reviewed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check that `log`, planned for `root`, matches the reviewed plan.
    ///
    /// # Errors
    ///
    /// Returns the first difference found.
    pub fn verify(&self, root: &Path, log: &ActionLog) -> Result<(), PreflightError> {
        if self.root != root {
            return Err(PreflightError::RootMismatch {
                expected: self.root.clone(),
                found: root.to_path_buf(),
            });
        }

        let actions = log.actions();
        for (seq, (expected, action)) in self.steps.iter().zip(actions).enumerate() {
            let found = PlannedStep::from(action);
            if *expected != found {
                return Err(PreflightError::StepMismatch {
                    seq,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        if self.steps.len() != actions.len() {
            return Err(PreflightError::LengthMismatch {
                expected: self.steps.len(),
                found: actions.len(),
            });
        }

        log::info!("Pre-flight verified: {} actions match", actions.len());
        Ok(())
    }
}

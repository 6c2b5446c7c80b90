//! Run status, exit codes and structured errors.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::engine::EngineError;

/// Process exit codes.
///
/// - 0: Success
/// - 1: General error (unexpected failure, bad root, pre-flight mismatch)
/// - 2: Invalid configuration
/// - 3: Partial failure (some live actions failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The run completed and every action succeeded.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Configuration failed validation.
    ConfigInvalid = 2,
    /// The run completed but some actions failed.
    PartialFailure = 3,
    /// Interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "TT000",
            Self::GeneralError => "TT001",
            Self::ConfigInvalid => "TT002",
            Self::PartialFailure => "TT003",
            Self::Interrupted => "TT130",
        }
    }

    /// Exit code for an error that aborted a run.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        if err.downcast_ref::<ConfigError>().is_some() {
            return Self::ConfigInvalid;
        }
        match err.downcast_ref::<EngineError>() {
            Some(EngineError::Config(_)) => Self::ConfigInvalid,
            Some(EngineError::Interrupted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

/// Overall outcome recorded in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Every action is planned or applied
    #[default]
    Success,
    /// Some actions failed; the rest ran
    PartialFailure,
    /// The run did not complete
    Failure,
}

impl RunStatus {
    /// Exit code for this status.
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::Success,
            Self::PartialFailure => ExitCode::PartialFailure,
            Self::Failure => ExitCode::GeneralError,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PartialFailure => write!(f, "partial-failure"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "TT002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

//! Command-line interface definitions for treetidy.
//!
//! Global options (verbosity, colour, error format, config file) apply to
//! every subcommand. Flags override the layered configuration.
//!
//! # Example
//!
//! ```bash
//! # Plan a cleanup and keep the report for review
//! treetidy plan ./tree --prefer minix4/ --prefer src/ --report plan.json
//!
//! # Apply exactly the reviewed plan
//! treetidy apply ./tree --preflight plan.json
//!
//! # Show the effective configuration
//! treetidy config
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::EngineConfig;

/// Duplicate consolidation planner.
///
/// treetidy finds exact and near-duplicate files, flags files that break the
/// directory layout, and emits an ordered, auditable action plan. Nothing is
/// changed on disk unless a reviewed plan is applied with `apply`.
#[derive(Debug, Parser)]
#[command(name = "treetidy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML); defaults to the platform config directory
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a tree and plan a cleanup without changing anything
    Plan(PlanArgs),
    /// Apply a plan that was reviewed as a dry-run report
    Apply(ApplyArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Options shared by `plan` and `apply`.
#[derive(Debug, Args)]
pub struct TuningArgs {
    /// Root directory to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Minimum similarity ratio for near-duplicates (0.0 to 1.0)
    #[arg(long, value_name = "RATIO", value_parser = parse_ratio)]
    pub threshold: Option<f64>,

    /// Maximum number of near-duplicate comparisons
    #[arg(long = "max-pairs", value_name = "N")]
    pub max_pairs: Option<usize>,

    /// Preferred directory prefix, most preferred first (repeatable)
    ///
    /// Replaces the configured list when given.
    #[arg(long = "prefer", value_name = "DIR")]
    pub prefer: Vec<String>,

    /// Additional protected file name (repeatable)
    #[arg(long = "protect", value_name = "NAME")]
    pub protect: Vec<String>,

    /// Gitignore-style pattern to exclude from the walk (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Number of I/O threads for hashing and similarity
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Bytes sampled per file (e.g., 8KiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub sample_size: Option<u64>,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Reuse hashes from a previous JSON report
    #[arg(long, value_name = "REPORT")]
    pub cache_report: Option<PathBuf>,

    /// What to print on stdout
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Also write the full JSON report to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl TuningArgs {
    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
        if let Some(max_pairs) = self.max_pairs {
            config.max_similarity_pairs = max_pairs;
        }
        if !self.prefer.is_empty() {
            config.preferred_directories = self.prefer.clone();
        }
        config.protected_filenames.extend(self.protect.iter().cloned());
        config.exclude_patterns.extend(self.exclude.iter().cloned());
        if let Some(threads) = self.io_threads {
            config.io_threads = threads;
        }
        if let Some(bytes) = self.sample_size {
            config.sample_bytes = usize::try_from(bytes).unwrap_or(usize::MAX);
        }
        if self.skip_hidden {
            config.skip_hidden = true;
        }
    }
}

/// Arguments for the plan subcommand.
#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Arguments for the apply subcommand.
#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub tuning: TuningArgs,

    /// Dry-run report whose action list must match the fresh plan
    #[arg(long, value_name = "REPORT")]
    pub preflight: PathBuf,

    /// Delete permanently instead of moving to trash
    ///
    /// Warning: Files cannot be recovered after permanent deletion.
    #[arg(long)]
    pub permanent: bool,
}

/// What to print on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Short human-readable summary
    Text,
    /// The full JSON report
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a ratio in `[0, 1]`.
///
/// # Errors
///
/// Returns an error for anything that is not a number in range.
pub fn parse_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Ratio must be between 0.0 and 1.0, got {value}"));
    }
    Ok(value)
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use treetidy::cli::parse_size;
///
/// assert_eq!(parse_size("4096").unwrap(), 4096);
/// assert_eq!(parse_size("8KiB").unwrap(), 8192);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

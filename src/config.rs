//! Engine configuration.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`EngineConfig::default`])
//! 2. A TOML file: `--config PATH`, else `treetidy/config.toml` in the
//!    platform config directory when it exists
//! 3. Environment variables prefixed `TREETIDY_` (`__` separates nested keys,
//!    e.g. `TREETIDY_SCORING__COPY_PENALTY=80`)
//! 4. Command-line flags, applied by the CLI on the extracted value
//!
//! Every pattern is compiled by [`EngineConfig::validate`] before a scan
//! starts, so a bad regex fails the run up front.

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::duplicates::{SimilarityConfig, DEFAULT_MAX_SIMILARITY_PAIRS, DEFAULT_SIMILARITY_THRESHOLD};
use crate::policy::{default_misplacement_rules, default_suspicious_patterns, Policy, PolicyError, PolicyRule};
use crate::quality::{QualityScorer, ScoringConfig};
use crate::scanner::indexer::DEFAULT_IO_THREADS;
use crate::scanner::{WalkerConfig, DEFAULT_SAMPLE_BYTES};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TREETIDY_";

/// Whether a run only plans or also applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Plan only; the filesystem is never touched
    #[default]
    DryRun,
    /// Apply the plan after pre-flight verification
    Live,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry-run"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// File names that are never removed or moved.
#[must_use]
pub fn default_protected_filenames() -> Vec<String> {
    [
        "Makefile",
        "makefile",
        "GNUmakefile",
        "meson.build",
        "meson_options.txt",
        "CMakeLists.txt",
        "configure",
        "Cargo.toml",
        "package.json",
        "README",
        "LICENSE",
        "COPYING",
        "AUTHORS",
        "CHANGELOG",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be read or does not fit the schema.
    #[error("invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The threshold is NaN or outside `[0, 1]`.
    #[error("similarity_threshold must be within [0, 1], got {0}")]
    Threshold(f64),

    /// A count that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// A misplacement rule would move files outside the scan root.
    #[error("misplacement rule {rule_id}: move_to {move_to:?} leaves the scan root")]
    MoveOutsideRoot {
        /// Offending rule
        rule_id: String,
        /// Its relocation directory
        move_to: String,
    },

    /// A rule or heuristic pattern does not compile.
    #[error(transparent)]
    Pattern(#[from] PolicyError),

    /// The effective configuration could not be rendered.
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// All tunables of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum ratio for a near-duplicate pair
    pub similarity_threshold: f64,
    /// Cap on candidate comparisons
    pub max_similarity_pairs: usize,
    /// Bytes sampled per file for similarity and content scoring
    pub sample_bytes: usize,
    /// Hashing and similarity workers
    pub io_threads: usize,
    /// Root-relative directory prefixes, most preferred first
    pub preferred_directories: Vec<String>,
    /// File name prefixes that are never removed or moved
    pub protected_filenames: Vec<String>,
    /// Rules matched against file names
    pub suspicious_patterns: Vec<PolicyRule>,
    /// Rules matched against root-relative paths
    pub misplacement_rules: Vec<PolicyRule>,
    /// Retention scoring weights
    pub scoring: ScoringConfig,
    /// Dry-run or live
    pub mode: Mode,
    /// Live removals go to the trash rather than being deleted
    pub use_trash: bool,
    /// Skip hidden files and directories
    pub skip_hidden: bool,
    /// Gitignore-style patterns excluded from the walk
    pub exclude_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_similarity_pairs: DEFAULT_MAX_SIMILARITY_PAIRS,
            sample_bytes: DEFAULT_SAMPLE_BYTES,
            io_threads: DEFAULT_IO_THREADS,
            preferred_directories: Vec::new(),
            protected_filenames: default_protected_filenames(),
            suspicious_patterns: default_suspicious_patterns(),
            misplacement_rules: default_misplacement_rules(),
            scoring: ScoringConfig::default(),
            mode: Mode::DryRun,
            use_trash: true,
            skip_hidden: false,
            exclude_patterns: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// The default config file location, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "treetidy", "treetidy")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The figment for defaults, a TOML file and the environment.
    ///
    /// An explicit `path` must exist; the default location is used only when
    /// present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] for a missing explicit file.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(default) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Loading config from {}", default.display());
                    figment = figment.merge(Toml::file(default));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the layered configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any layer is malformed or the result is
    /// invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path)?.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and compile every pattern.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            // NaN fails `contains` too.
            return Err(ConfigError::Threshold(self.similarity_threshold));
        }
        if self.io_threads == 0 {
            return Err(ConfigError::Zero("io_threads"));
        }
        if self.sample_bytes == 0 {
            return Err(ConfigError::Zero("sample_bytes"));
        }
        if self.scoring.size_bonus_divisor == 0 {
            return Err(ConfigError::Zero("scoring.size_bonus_divisor"));
        }
        for rule in &self.misplacement_rules {
            if let Some(move_to) = rule.move_to.as_deref() {
                // Leading slashes are dropped when targets are joined to the root.
                let stays_inside = Path::new(move_to.trim_start_matches('/'))
                    .components()
                    .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
                if !stays_inside {
                    return Err(ConfigError::MoveOutsideRoot {
                        rule_id: rule.id.clone(),
                        move_to: move_to.to_string(),
                    });
                }
            }
        }
        self.compile_policy()?;
        self.compile_scorer()?;
        Ok(())
    }

    /// Compile the misplacement and suspicious rules.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] for the first bad pattern.
    pub fn compile_policy(&self) -> Result<Policy, PolicyError> {
        Policy::compile(&self.misplacement_rules, &self.suspicious_patterns)
    }

    /// Compile the quality scorer.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] for the first bad heuristic.
    pub fn compile_scorer(&self) -> Result<QualityScorer, PolicyError> {
        QualityScorer::new(self.scoring.clone(), self.preferred_directories.clone())
    }

    /// Walker options.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.skip_hidden, self.exclude_patterns.clone())
    }

    /// Similarity options, without shutdown flag or progress.
    #[must_use]
    pub fn similarity_config(&self) -> SimilarityConfig {
        SimilarityConfig::default()
            .with_threshold(self.similarity_threshold)
            .with_max_pairs(self.max_similarity_pairs)
            .with_io_threads(self.io_threads)
    }

    /// The configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

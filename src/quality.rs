//! Retention scoring: which copy of a file is worth keeping.
//!
//! A [`QualityScore`] is a pure function of a [`FileRecord`] and the
//! [`ScoringConfig`]:
//!
//! ```text
//! score = directory_priority + content + size_bonus - penalties
//! ```
//!
//! Content heuristics run on the record's bounded text sample, so scoring
//! never touches the disk. Ranking breaks ties by path so the keeper is
//! reproducible.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

use crate::policy::PolicyError;
use crate::scanner::path_utils::is_under_prefix;
use crate::scanner::FileRecord;

/// A content pattern worth a fixed bonus when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heuristic {
    /// Identifier used in error messages
    pub id: String,
    /// Regular expression searched in the sample
    pub pattern: String,
    /// Points added when the pattern matches
    pub bonus: i64,
}

impl Heuristic {
    fn new(id: &str, pattern: &str, bonus: i64) -> Self {
        Self {
            id: id.to_string(),
            pattern: pattern.to_string(),
            bonus,
        }
    }
}

/// Weights and patterns for quality scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per rank step in `preferred_directories`
    pub directory_weight: i64,
    /// Points per comment line
    pub comment_line_weight: i64,
    /// Pattern identifying a comment line (multi-line mode)
    pub comment_pattern: String,
    /// Bonus patterns
    pub heuristics: Vec<Heuristic>,
    /// Files larger than this get no content score
    pub heuristics_size_ceiling: u64,
    /// Bytes per size-bonus point
    pub size_bonus_divisor: u64,
    /// Maximum size bonus
    pub size_bonus_cap: i64,
    /// Penalty for a copy/backup marker in the file name
    pub copy_penalty: i64,
    /// Case-insensitive file name markers of a copy
    pub copy_markers: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            directory_weight: 100,
            comment_line_weight: 2,
            comment_pattern: r"^\s*[/*#]".to_string(),
            heuristics: vec![
                Heuristic::new("doc-comment", r"(?s)/\*\*.*@brief", 20),
                Heuristic::new("include", r#"#include\s*[<"]"#, 10),
                Heuristic::new("error-handling", r"errno|EINVAL|ENOMEM", 10),
                Heuristic::new("modern-c", r"_Static_assert|typeof|_BitInt", 15),
            ],
            heuristics_size_ceiling: 1024 * 1024,
            size_bonus_divisor: 100,
            size_bonus_cap: 50,
            copy_penalty: 50,
            copy_markers: ["copy", "backup", ".bak", ".orig", ".old", ".tmp", "~"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Score components for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityScore {
    /// Scored file
    pub path: PathBuf,
    /// Sum of the components
    pub score: i64,
    /// From the preferred directory list
    pub directory_priority: i64,
    /// From comment lines and heuristics
    pub content: i64,
    /// From file size
    pub size_bonus: i64,
    /// Subtracted for copy markers
    pub penalties: i64,
}

/// Compiled scorer.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    config: ScoringConfig,
    preferred_directories: Vec<String>,
    comment: Regex,
    heuristics: Vec<(Regex, i64)>,
}

impl QualityScorer {
    /// Compile the scoring patterns.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] naming the first pattern that fails to compile.
    pub fn new(config: ScoringConfig, preferred_directories: Vec<String>) -> Result<Self, PolicyError> {
        let comment = compile("comment", &format!("(?m){}", config.comment_pattern))?;
        let heuristics = config
            .heuristics
            .iter()
            .map(|h| compile(&h.id, &h.pattern).map(|re| (re, h.bonus)))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            config,
            preferred_directories,
            comment,
            heuristics,
        })
    }

    /// Score one record.
    #[must_use]
    pub fn score(&self, record: &FileRecord) -> QualityScore {
        let directory_priority = self.directory_priority(&record.relative_path);
        let content = self.content_score(record);
        let size_bonus = self.size_bonus(record.size);
        let penalties = self.penalties(record.file_name());

        QualityScore {
            path: record.path.clone(),
            score: directory_priority
                .saturating_add(content)
                .saturating_add(size_bonus)
                .saturating_sub(penalties),
            directory_priority,
            content,
            size_bonus,
            penalties,
        }
    }

    /// Score and rank records: best first, ties by path ascending.
    #[must_use]
    pub fn rank<'a>(&self, records: impl IntoIterator<Item = &'a FileRecord>) -> Vec<QualityScore> {
        let mut scores: Vec<QualityScore> = records.into_iter().map(|r| self.score(r)).collect();
        scores.sort_by(compare_scores);
        scores
    }

    /// `(len - index) * weight` for the first preferred prefix containing the path.
    fn directory_priority(&self, relative: &str) -> i64 {
        let len = self.preferred_directories.len();
        self.preferred_directories
            .iter()
            .position(|prefix| is_under_prefix(relative, prefix))
            .map_or(0, |index| {
                i64::try_from(len - index)
                    .unwrap_or(i64::MAX)
                    .saturating_mul(self.config.directory_weight)
            })
    }

    fn content_score(&self, record: &FileRecord) -> i64 {
        let Some(sample) = record.sample_text.as_deref() else {
            return 0;
        };
        if record.size > self.config.heuristics_size_ceiling {
            return 0;
        }

        let comments = i64::try_from(self.comment.find_iter(sample).count()).unwrap_or(i64::MAX);
        let bonuses = self
            .heuristics
            .iter()
            .filter(|(re, _)| re.is_match(sample))
            .fold(0_i64, |acc, (_, bonus)| acc.saturating_add(*bonus));
        comments
            .saturating_mul(self.config.comment_line_weight)
            .saturating_add(bonuses)
    }

    fn size_bonus(&self, size: u64) -> i64 {
        if size == 0 {
            return 0;
        }
        let points = size / self.config.size_bonus_divisor.max(1);
        i64::try_from(points)
            .unwrap_or(i64::MAX)
            .min(self.config.size_bonus_cap)
    }

    fn penalties(&self, file_name: &str) -> i64 {
        if self.has_copy_marker(file_name) {
            self.config.copy_penalty
        } else {
            0
        }
    }

    /// Whether `file_name` contains a configured copy/backup marker.
    #[must_use]
    pub fn has_copy_marker(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.config
            .copy_markers
            .iter()
            .any(|m| name.contains(&m.to_lowercase()))
    }
}

/// Ranking order: higher score first, then path ascending.
#[must_use]
pub fn compare_scores(a: &QualityScore, b: &QualityScore) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path))
}

fn compile(id: &str, pattern: &str) -> Result<Regex, PolicyError> {
    Regex::new(pattern).map_err(|source| PolicyError {
        rule_id: id.to_string(),
        source,
    })
}

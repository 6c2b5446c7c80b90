//! Layout policy: ordered path rules that flag misplaced and suspicious files.
//!
//! Two independent categories are evaluated for every file:
//!
//! - **misplaced**: rules match the root-relative path (`src/old_main.c`).
//!   A rule may name a `move_to` directory, which the planner turns into a
//!   MOVE action.
//! - **suspicious**: rules match the file name only (`notes.txt~`).
//!
//! Within a category the first matching rule wins, so rule order is part of
//! the configuration. Content is never read.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scanner::FileRecord;

/// A configured rule, before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Stable rule identifier, reported with each violation
    pub id: String,
    /// Regular expression (`regex` crate syntax)
    pub pattern: String,
    /// Human-readable explanation
    pub reason: String,
    /// Root-relative directory a misplaced file belongs in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_to: Option<String>,
}

impl PolicyRule {
    /// Create a rule without a relocation target.
    #[must_use]
    pub fn new(id: &str, pattern: &str, reason: &str) -> Self {
        Self {
            id: id.to_string(),
            pattern: pattern.to_string(),
            reason: reason.to_string(),
            move_to: None,
        }
    }

    /// Set the relocation target.
    #[must_use]
    pub fn with_move_to(mut self, dir: &str) -> Self {
        self.move_to = Some(dir.to_string());
        self
    }
}

/// Default misplacement rules, evaluated in this order.
#[must_use]
pub fn default_misplacement_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new(
            "build-artifact",
            r"(?i)\.(o|obj|exe|dll|so|a|lib)$",
            "Build artifact in source tree",
        ),
        PolicyRule::new(
            "build-directory",
            r"(?i)(^|/)(debug|release|build)/",
            "Build directory in source tree",
        ),
        PolicyRule::new(
            "source-in-docs",
            r"(?i)(^|/)docs/.+\.(c|h|s|asm)$",
            "Source code in docs directory",
        )
        .with_move_to("archive/reorganized"),
        PolicyRule::new(
            "legacy-in-source",
            r"(?i)^src/(.*/)?[^/]*(legacy|old|backup)[^/]*$",
            "Legacy file in source directory",
        )
        .with_move_to("archive/legacy"),
    ]
}

/// Default suspicious-name rules, evaluated in this order.
#[must_use]
pub fn default_suspicious_patterns() -> Vec<PolicyRule> {
    [
        ("tmp", r"(?i)\.tmp$", "Temporary file"),
        ("temp", r"(?i)\.temp$", "Temporary file"),
        ("bak", r"(?i)\.bak$", "Backup file"),
        ("backup", r"(?i)\.backup$", "Backup file"),
        ("tilde", r"~$", "Editor backup file"),
        ("orig", r"(?i)\.orig$", "Merge leftover"),
        ("old", r"(?i)\.old$", "Old version"),
        ("copy", r"(?i)copy", "Copy of another file"),
        ("duplicate", r"(?i)duplicate", "Named as a duplicate"),
        ("numbered", r"\(\d+\)\.", "Numbered download copy"),
        ("conflict", r"(?i)\.conflict", "Sync conflict file"),
        ("thumbs-db", r"(?i)^thumbs\.db$", "OS metadata file"),
        ("desktop-ini", r"(?i)^desktop\.ini$", "OS metadata file"),
        ("ds-store", r"(?i)^\.ds_store$", "OS metadata file"),
    ]
    .into_iter()
    .map(|(id, pattern, reason)| PolicyRule::new(id, pattern, reason))
    .collect()
}

/// Violation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// File lives outside the directory it belongs in
    Misplaced,
    /// File name suggests a temporary, backup or stray file
    Suspicious,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Misplaced => write!(f, "misplaced"),
            Self::Suspicious => write!(f, "suspicious"),
        }
    }
}

/// A rule match against one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Which category matched
    pub category: Category,
    /// Identifier of the first matching rule
    pub rule_id: String,
    /// The rule's reason
    pub reason: String,
    /// Relocation target directory (misplaced rules only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_to: Option<String>,
}

/// Error compiling a rule's pattern.
#[derive(Debug, thiserror::Error)]
#[error("invalid pattern for rule '{rule_id}': {source}")]
pub struct PolicyError {
    /// Offending rule
    pub rule_id: String,
    /// Regex compile error
    #[source]
    pub source: regex::Error,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: PolicyRule,
    regex: Regex,
}

impl CompiledRule {
    fn compile(rule: &PolicyRule) -> Result<Self, PolicyError> {
        let regex = Regex::new(&rule.pattern).map_err(|source| PolicyError {
            rule_id: rule.id.clone(),
            source,
        })?;
        Ok(Self {
            rule: rule.clone(),
            regex,
        })
    }
}

/// Compiled, ready-to-run policy.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    misplacement: Vec<CompiledRule>,
    suspicious: Vec<CompiledRule>,
}

impl Policy {
    /// Compile both rule lists, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] for the first rule whose pattern fails to compile.
    pub fn compile(
        misplacement: &[PolicyRule],
        suspicious: &[PolicyRule],
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            misplacement: misplacement
                .iter()
                .map(CompiledRule::compile)
                .collect::<Result<_, _>>()?,
            suspicious: suspicious
                .iter()
                .map(CompiledRule::compile)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Violations for one file: at most one per category, misplaced first.
    #[must_use]
    pub fn classify(&self, record: &FileRecord) -> Vec<Violation> {
        let mut violations = Vec::new();

        if let Some(hit) = first_match(&self.misplacement, &record.relative_path) {
            violations.push(Violation {
                path: record.path.clone(),
                category: Category::Misplaced,
                rule_id: hit.rule.id.clone(),
                reason: hit.rule.reason.clone(),
                move_to: hit.rule.move_to.clone(),
            });
        }
        if let Some(hit) = first_match(&self.suspicious, record.file_name()) {
            violations.push(Violation {
                path: record.path.clone(),
                category: Category::Suspicious,
                rule_id: hit.rule.id.clone(),
                reason: hit.rule.reason.clone(),
                move_to: None,
            });
        }
        violations
    }

    /// Classify every record, in record order.
    #[must_use]
    pub fn classify_all(&self, records: &[FileRecord]) -> Vec<Violation> {
        let violations: Vec<Violation> = records.iter().flat_map(|r| self.classify(r)).collect();
        log::info!(
            "Policy: {} misplaced, {} suspicious",
            violations
                .iter()
                .filter(|v| v.category == Category::Misplaced)
                .count(),
            violations
                .iter()
                .filter(|v| v.category == Category::Suspicious)
                .count()
        );
        violations
    }
}

fn first_match<'a>(rules: &'a [CompiledRule], subject: &str) -> Option<&'a CompiledRule> {
    rules.iter().find(|r| r.regex.is_match(subject))
}

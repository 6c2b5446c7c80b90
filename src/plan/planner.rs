//! Consolidation planning.
//!
//! Decisions are made in three passes, each appending to one [`ActionLog`]:
//!
//! 1. Exact-duplicate groups, in group order. A group containing a protected
//!    file is kept whole; otherwise the best-ranked member is kept and every
//!    other member is removed in favour of it.
//! 2. Similar pairs, in pair order, with the same keeper logic restricted to
//!    the pair. A pair touching a file that already has a REMOVE or was kept
//!    as protected is skipped, and so is a pair whose loser is already some
//!    REMOVE's keeper.
//! 3. Misplaced files with a relocation target, in path order.
//!
//! A path receives at most one REMOVE or MOVE, and none once it has been
//! kept as protected by any pass.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::ActionLog;
use crate::duplicates::{DuplicateGroup, SimilarPair};
use crate::policy::{Category, Violation};
use crate::quality::QualityScorer;
use crate::scanner::FileRecord;

/// Reason recorded for every member of a protected group or pair.
pub const PROTECTED_REASON: &str = "protected";

/// Turns analysis results into an [`ActionLog`].
#[derive(Debug)]
pub struct Planner<'a> {
    root: PathBuf,
    scorer: &'a QualityScorer,
    protected: Vec<String>,
}

impl<'a> Planner<'a> {
    /// Create a planner.
    ///
    /// `protected_filenames` match case-insensitively against the start of a
    /// file name, so `README` protects `README.md` and `readme.txt`. A name
    /// carrying one of the scorer's copy markers is never protected.
    #[must_use]
    pub fn new(root: &Path, scorer: &'a QualityScorer, protected_filenames: &[String]) -> Self {
        Self {
            root: root.to_path_buf(),
            scorer,
            protected: protected_filenames
                .iter()
                .map(|n| n.to_lowercase())
                .collect(),
        }
    }

    /// Whether `record` is protected from removal and relocation.
    #[must_use]
    pub fn is_protected(&self, record: &FileRecord) -> bool {
        let name = record.file_name().to_lowercase();
        self.protected.iter().any(|p| name.starts_with(p.as_str()))
            && !self.scorer.has_copy_marker(&name)
    }

    /// Build the action log.
    ///
    /// `records` must contain every path named by the groups, pairs and
    /// violations; unknown paths are skipped with a warning.
    #[must_use]
    pub fn plan(
        &self,
        records: &[FileRecord],
        groups: &[DuplicateGroup],
        pairs: &[SimilarPair],
        violations: &[Violation],
    ) -> ActionLog {
        let by_path: HashMap<&Path, &FileRecord> =
            records.iter().map(|r| (r.path.as_path(), r)).collect();
        let mut log = ActionLog::new();

        for group in groups {
            let Some(members) = lookup(&by_path, &group.members) else {
                log::warn!("{}: member missing from index, skipped", group.id);
                continue;
            };
            self.plan_group(&mut log, &group.id, &members, |keeper| {
                format!("duplicate-of:{}", keeper.display())
            });
        }

        for (n, pair) in pairs.iter().enumerate() {
            let group_id = format!("sim-{}", n + 1);
            let paths = [pair.file_a.clone(), pair.file_b.clone()];
            if paths.iter().any(|p| log.is_mutated(p)) {
                log::debug!("{}: already resolved by an earlier action, skipped", group_id);
                continue;
            }
            if paths.iter().any(|p| log.is_pinned(p)) {
                log::debug!("{}: touches a protected file, skipped", group_id);
                continue;
            }
            let Some(members) = lookup(&by_path, &paths) else {
                log::warn!("{}: member missing from index, skipped", group_id);
                continue;
            };
            if !members.iter().any(|m| self.is_protected(m)) {
                let ranked = self.scorer.rank(members.iter().copied());
                if log.is_keeper(&ranked[1].path) {
                    log::debug!(
                        "{}: {} is already a keeper, skipped",
                        group_id,
                        ranked[1].path.display()
                    );
                    continue;
                }
            }
            let ratio = pair.ratio;
            self.plan_group(&mut log, &group_id, &members, |keeper| {
                format!("near-duplicate-of:{} (ratio {:.3})", keeper.display(), ratio)
            });
        }

        self.plan_moves(&mut log, &by_path, violations);

        log::info!("Planned {} actions", log.len());
        log
    }

    /// Keeper selection for one group or pair.
    fn plan_group(
        &self,
        log: &mut ActionLog,
        group_id: &str,
        members: &[&FileRecord],
        remove_reason: impl Fn(&Path) -> String,
    ) {
        if members.iter().any(|m| self.is_protected(m)) {
            for member in members {
                log.pin(&member.path, PROTECTED_REASON, group_id);
            }
            return;
        }

        let ranked = self.scorer.rank(members.iter().copied());
        let Some(best) = ranked.first() else {
            return;
        };
        let keeper = best.path.clone();
        log.keep(&keeper, format!("keeper (score {})", best.score), group_id);

        for member in members {
            if member.path != keeper {
                log.remove(&member.path, &keeper, remove_reason(&keeper), group_id);
            }
        }
    }

    fn plan_moves(
        &self,
        log: &mut ActionLog,
        by_path: &HashMap<&Path, &FileRecord>,
        violations: &[Violation],
    ) {
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for violation in violations {
            if violation.category != Category::Misplaced {
                continue;
            }
            let Some(move_to) = violation.move_to.as_deref() else {
                continue;
            };
            let Some(record) = by_path.get(violation.path.as_path()) else {
                continue;
            };

            let target = self
                .root
                .join(move_to.trim_matches('/'))
                .join(record.file_name());
            let skip = if self.is_protected(record) || log.is_pinned(&record.path) {
                Some("protected")
            } else if log.is_mutated(&record.path) {
                Some("already removed or moved")
            } else if target == record.path {
                Some("already in place")
            } else if target.symlink_metadata().is_ok() {
                Some("target exists")
            } else if claimed.contains(&target) {
                Some("target claimed by another move")
            } else {
                None
            };
            if let Some(why) = skip {
                log::debug!("No move for {}: {}", record.path.display(), why);
                continue;
            }

            claimed.insert(target.clone());
            log.relocate(
                &record.path,
                &target,
                format!("{}: {}", violation.rule_id, violation.reason),
                &format!("move-{}", violation.rule_id),
            );
        }
    }
}

fn lookup<'r>(
    by_path: &HashMap<&Path, &'r FileRecord>,
    paths: &[PathBuf],
) -> Option<Vec<&'r FileRecord>> {
    paths
        .iter()
        .map(|p| by_path.get(p.as_path()).copied())
        .collect()
}

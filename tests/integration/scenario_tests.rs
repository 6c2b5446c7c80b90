//! End-to-end dry runs over small trees with known answers.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use treetidy::config::EngineConfig;
use treetidy::engine::Engine;
use treetidy::error::RunStatus;
use treetidy::plan::{ActionKind, Outcome};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn canonical(dir: &TempDir) -> PathBuf {
    dir.path().canonicalize().unwrap()
}

fn numbered_lines(changed: &[usize]) -> String {
    (0..20)
        .map(|i| {
            if changed.contains(&i) {
                format!("edit {:02}\n", i)
            } else {
                format!("line {:02}\n", i)
            }
        })
        .collect()
}

#[test]
fn test_preferred_directory_picks_keeper() {
    let dir = TempDir::new().unwrap();
    for rel in ["a/x.c", "legacy/x.c", "minix4/x.c"] {
        write(dir.path(), rel, "int x;\n");
    }
    let root = canonical(&dir);

    let config = EngineConfig {
        preferred_directories: vec!["minix4/".into(), "a/".into(), "legacy/".into()],
        ..EngineConfig::default()
    };
    let report = Engine::new(config).run(dir.path()).unwrap();

    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(report.actions.len(), 3);

    let keep: Vec<_> = report
        .actions
        .iter()
        .filter(|a| a.kind == ActionKind::Keep)
        .collect();
    assert_eq!(keep.len(), 1);
    assert_eq!(keep[0].source, root.join("minix4/x.c"));

    let removed: HashSet<_> = report
        .actions
        .iter()
        .filter(|a| a.kind == ActionKind::Remove)
        .map(|a| a.source.clone())
        .collect();
    assert_eq!(
        removed,
        HashSet::from([root.join("a/x.c"), root.join("legacy/x.c")])
    );
    for action in report.actions.iter().filter(|a| a.kind == ActionKind::Remove) {
        assert_eq!(action.keeper.as_deref(), Some(root.join("minix4/x.c").as_path()));
        assert_eq!(
            action.reason,
            format!("duplicate-of:{}", root.join("minix4/x.c").display())
        );
    }

    // Dry run: nothing moved.
    for rel in ["a/x.c", "legacy/x.c", "minix4/x.c"] {
        assert!(root.join(rel).exists());
    }
}

#[test]
fn test_fifty_empty_files_form_one_group() {
    let dir = TempDir::new().unwrap();
    for i in 0..50 {
        write(dir.path(), &format!("f{:02}.txt", i), "");
    }

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(report.summary.total_files, 50);
    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(report.duplicate_groups[0].len(), 50);
    assert_eq!(report.summary.actions.keep, 1);
    assert_eq!(report.summary.actions.remove, 49);
    assert_eq!(report.summary.reclaimable_bytes, 0);
    assert!(report.similar_pairs.is_empty());
}

#[test]
fn test_near_duplicate_pair_above_threshold() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "v1.c", &numbered_lines(&[]));
    write(dir.path(), "v2.c", &numbered_lines(&[3, 9, 15]));
    let root = canonical(&dir);

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert!(report.duplicate_groups.is_empty());
    assert_eq!(report.similar_pairs.len(), 1);
    let pair = &report.similar_pairs[0];
    assert!((pair.ratio - 0.85).abs() < 1e-9);
    assert_eq!(pair.file_a, root.join("v1.c"));
    assert_eq!(pair.file_b, root.join("v2.c"));

    assert_eq!(report.actions.len(), 2);
    assert_eq!(report.actions[0].kind, ActionKind::Keep);
    assert_eq!(report.actions[1].kind, ActionKind::Remove);
    assert!(report.actions[1].reason.starts_with("near-duplicate-of:"));
    assert!(report.actions.iter().all(|a| a.group_id == "sim-1"));
}

#[test]
fn test_near_duplicate_pair_below_threshold() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "v1.c", &numbered_lines(&[]));
    write(dir.path(), "v2.c", &numbered_lines(&[3, 9, 15]));

    let config = EngineConfig {
        similarity_threshold: 0.9,
        ..EngineConfig::default()
    };
    let report = Engine::new(config).run(dir.path()).unwrap();

    assert_eq!(report.summary.comparisons, 1);
    assert!(report.similar_pairs.is_empty());
    assert!(report.actions.is_empty());
}

#[test]
fn test_protected_member_keeps_whole_group() {
    let dir = TempDir::new().unwrap();
    for rel in ["README", "a/notes.txt", "b/notes.txt", "c/notes.txt", "d/notes.txt"] {
        write(dir.path(), rel, "same words\n");
    }

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(report.actions.len(), 5);
    assert!(report
        .actions
        .iter()
        .all(|a| a.kind == ActionKind::Keep && a.reason == "protected"));
}

#[test]
fn test_zero_pair_cap_truncates() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "v1.c", &numbered_lines(&[]));
    write(dir.path(), "v2.c", &numbered_lines(&[3]));

    let config = EngineConfig {
        max_similarity_pairs: 0,
        ..EngineConfig::default()
    };
    let report = Engine::new(config).run(dir.path()).unwrap();

    assert!(report.similar_pairs.is_empty());
    assert_eq!(report.summary.comparisons, 0);
    assert!(report.summary.similarity_truncated);
    assert_eq!(report.status, RunStatus::Success);
}

#[test]
fn test_misplaced_file_gets_move() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "docs/boot.s", "; boot\n");
    write(dir.path(), "src/main.c", "int main;\n");
    let root = canonical(&dir);

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(report.summary.misplaced, 1);
    let moves: Vec<_> = report
        .actions
        .iter()
        .filter(|a| a.kind == ActionKind::Move)
        .collect();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].source, root.join("docs/boot.s"));
    assert_eq!(
        moves[0].target.as_deref(),
        Some(root.join("archive/reorganized/boot.s").as_path())
    );
    assert_eq!(moves[0].group_id, "move-source-in-docs");
}

#[test]
fn test_suspicious_names_are_reported_without_actions() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.txt~", "draft one\n");
    write(dir.path(), "data.tmp", "scratch\n");

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(report.summary.suspicious, 2);
    assert!(report.actions.is_empty());
}

#[test]
fn test_every_path_mutated_at_most_once() {
    let dir = TempDir::new().unwrap();
    // Exact group, a near variant of the loser, and a misplaced copy.
    let base = numbered_lines(&[]);
    write(dir.path(), "a/x.c", &base);
    write(dir.path(), "b/x.c", &base);
    write(dir.path(), "c/x.c", &numbered_lines(&[1]));
    write(dir.path(), "docs/x.c", &base);

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    let mut seen = HashSet::new();
    for action in report.actions.iter().filter(|a| a.kind != ActionKind::Keep) {
        assert!(
            seen.insert(action.source.clone()),
            "{} mutated twice",
            action.source.display()
        );
    }
    for action in report.actions.iter().filter(|a| a.kind == ActionKind::Remove) {
        let keeper = action.keeper.as_ref().unwrap();
        assert!(!seen.contains(keeper), "keeper {} is removed", keeper.display());
    }
}

#[test]
fn test_dry_run_is_deterministic_and_idempotent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/x.c", "int x;\n");
    write(dir.path(), "b/x.c", "int x;\n");
    write(dir.path(), "c/y.c", &numbered_lines(&[]));
    write(dir.path(), "d/y.c", &numbered_lines(&[7]));
    write(dir.path(), "docs/z.c", "int z;\n");

    let first = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    let second = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(first.actions, second.actions);
    assert_eq!(first.duplicate_groups, second.duplicate_groups);
    assert_eq!(first.similar_pairs, second.similar_pairs);
    assert!(first
        .actions
        .iter()
        .all(|a| a.outcome == Outcome::Planned));
    for (seq, action) in first.actions.iter().enumerate() {
        assert_eq!(action.seq, seq);
    }
}

#[test]
fn test_empty_root_plans_nothing() {
    let dir = TempDir::new().unwrap();

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(report.summary.total_files, 0);
    assert!(report.actions.is_empty());
    assert_eq!(report.status, RunStatus::Success);
}

#[test]
fn test_near_variant_never_removes_a_protected_copy() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "README", &numbered_lines(&[]));
    write(dir.path(), "notes/a.txt", &numbered_lines(&[]));
    write(dir.path(), "a/b.txt", &numbered_lines(&[3]));
    let root = canonical(&dir);

    let config = EngineConfig {
        preferred_directories: vec!["a/".into()],
        ..EngineConfig::default()
    };
    let report = Engine::new(config).run(dir.path()).unwrap();

    assert_eq!(report.duplicate_groups.len(), 1);
    let group_id = report.duplicate_groups[0].id.clone();
    for action in &report.actions {
        if action.group_id == group_id {
            assert_eq!(action.kind, ActionKind::Keep);
            assert_eq!(action.reason, "protected");
        }
        if action.source == root.join("README") || action.source == root.join("notes/a.txt") {
            assert_eq!(action.kind, ActionKind::Keep, "{:?}", action);
        }
    }
}

#[test]
fn test_protected_copy_in_docs_is_not_moved() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "README", "int readme;\n");
    write(dir.path(), "docs/x.c", "int readme;\n");
    let root = canonical(&dir);

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert!(report
        .violations
        .iter()
        .any(|v| v.path == root.join("docs/x.c") && v.move_to.is_some()));
    assert_eq!(report.actions.len(), 2);
    assert!(report
        .actions
        .iter()
        .all(|a| a.kind == ActionKind::Keep && a.reason == "protected"));
}

#[test]
fn test_backup_of_protected_name_is_consolidated() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Makefile", "all:\n\tcc x.c\n");
    write(dir.path(), "old/Makefile.bak", "all:\n\tcc x.c\n");

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    // Makefile still protects the group it shares with its backup.
    assert!(report.actions.iter().all(|a| a.kind == ActionKind::Keep));

    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/notes.bak", "draft\n");
    write(dir.path(), "b/README.bak", "draft\n");
    let other = canonical(&dir);
    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    let removed: Vec<_> = report
        .actions
        .iter()
        .filter(|a| a.kind == ActionKind::Remove)
        .map(|a| a.source.clone())
        .collect();
    assert_eq!(removed, vec![other.join("b/README.bak")]);
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;
use treetidy::config::EngineConfig;
use treetidy::duplicates::{group_by_hash, SimilarPair};
use treetidy::engine::Engine;
use treetidy::plan::{ActionKind, Planner};
use treetidy::policy::{Policy, PolicyRule};
use treetidy::quality::{QualityScorer, ScoringConfig};
use treetidy::scanner::FileRecord;

fn rec(root: &Path, rel: &str, hash: u8, text: &str) -> FileRecord {
    FileRecord::new(
        root.join(rel),
        rel,
        text.len() as u64,
        [hash; 32],
        SystemTime::UNIX_EPOCH,
    )
    .with_sample(Some(text.to_string()))
}

fn default_scorer() -> QualityScorer {
    QualityScorer::new(ScoringConfig::default(), Vec::new()).unwrap()
}

fn no_protection() -> Vec<String> {
    Vec::new()
}

#[test]
fn test_commented_copy_wins() {
    let dir = TempDir::new().unwrap();
    let plain = "int f(void);\nint g(void);\n";
    let documented = "/* f */\nint f(void);\n";
    // Same hash only for the test; the scorer looks at samples.
    let records = vec![
        rec(dir.path(), "a/f.h", 1, plain),
        rec(dir.path(), "b/f.h", 1, documented),
    ];
    let (groups, _) = group_by_hash(&records);
    let scorer = default_scorer();

    let log = Planner::new(dir.path(), &scorer, &no_protection()).plan(&records, &groups, &[], &[]);

    assert_eq!(log.actions()[0].kind, ActionKind::Keep);
    assert_eq!(log.actions()[0].source, dir.path().join("b/f.h"));
}

#[test]
fn test_copy_marker_loses() {
    let dir = TempDir::new().unwrap();
    let records = vec![
        rec(dir.path(), "a/main copy.c", 1, "int main;\n"),
        rec(dir.path(), "b/main.c", 1, "int main;\n"),
    ];
    let (groups, _) = group_by_hash(&records);
    let scorer = default_scorer();

    let log = Planner::new(dir.path(), &scorer, &no_protection()).plan(&records, &groups, &[], &[]);

    assert_eq!(log.actions()[0].source, dir.path().join("b/main.c"));
    assert_eq!(log.actions()[1].source, dir.path().join("a/main copy.c"));
    assert_eq!(log.actions()[1].kind, ActionKind::Remove);
}

#[test]
fn test_directory_preference_beats_content() {
    let dir = TempDir::new().unwrap();
    let records = vec![
        rec(dir.path(), "legacy/f.c", 1, "// one\n// two\n// three\n"),
        rec(dir.path(), "minix4/f.c", 1, "// one\n// two\n// three\n"),
    ];
    let (groups, _) = group_by_hash(&records);
    let scorer =
        QualityScorer::new(ScoringConfig::default(), vec!["minix4".into(), "legacy".into()])
            .unwrap();

    let log = Planner::new(dir.path(), &scorer, &no_protection()).plan(&records, &groups, &[], &[]);

    assert_eq!(log.actions()[0].source, dir.path().join("minix4/f.c"));
}

#[test]
fn test_prefix_must_end_on_component() {
    let scorer = QualityScorer::new(ScoringConfig::default(), vec!["src".into()]).unwrap();
    let root = Path::new("/r");

    let inside = scorer.score(&rec(root, "src/a.c", 0, ""));
    let lookalike = scorer.score(&rec(root, "src2/a.c", 0, ""));

    assert_eq!(inside.directory_priority, 100);
    assert_eq!(lookalike.directory_priority, 0);
}

#[test]
fn test_move_skipped_when_target_exists() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("archive/reorganized")).unwrap();
    fs::write(dir.path().join("archive/reorganized/boot.s"), "; other\n").unwrap();
    let records = vec![rec(dir.path(), "docs/boot.s", 1, "; boot\n")];
    let policy = Policy::compile(
        &[PolicyRule::new("source-in-docs", r"^docs/.+\.s$", "Source in docs")
            .with_move_to("archive/reorganized")],
        &[],
    )
    .unwrap();
    let violations = policy.classify_all(&records);
    let scorer = default_scorer();

    let log = Planner::new(dir.path(), &scorer, &no_protection()).plan(&records, &[], &[], &violations);

    assert_eq!(violations.len(), 1);
    assert!(log.is_empty());
}

#[test]
fn test_second_move_to_same_target_skipped() {
    let dir = TempDir::new().unwrap();
    let records = vec![
        rec(dir.path(), "docs/a/boot.s", 1, "; one\n"),
        rec(dir.path(), "docs/b/boot.s", 2, "; two\n"),
    ];
    let policy = Policy::compile(
        &[PolicyRule::new("source-in-docs", r"^docs/.+\.s$", "Source in docs")
            .with_move_to("archive")],
        &[],
    )
    .unwrap();
    let violations = policy.classify_all(&records);
    let scorer = default_scorer();

    let log = Planner::new(dir.path(), &scorer, &no_protection()).plan(&records, &[], &[], &violations);

    assert_eq!(log.len(), 1);
    let action = &log.actions()[0];
    assert_eq!(action.kind, ActionKind::Move);
    assert_eq!(action.source, dir.path().join("docs/a/boot.s"));
    assert_eq!(action.target.as_deref(), Some(dir.path().join("archive/boot.s").as_path()));
}

#[test]
fn test_protected_file_never_moves() {
    let dir = TempDir::new().unwrap();
    let records = vec![rec(dir.path(), "docs/Makefile.s", 1, "all:\n")];
    let policy = Policy::compile(
        &[PolicyRule::new("source-in-docs", r"^docs/.+\.s$", "Source in docs")
            .with_move_to("archive")],
        &[],
    )
    .unwrap();
    let violations = policy.classify_all(&records);
    let scorer = default_scorer();

    let log = Planner::new(dir.path(), &scorer, &["Makefile".to_string()])
        .plan(&records, &[], &[], &violations);

    assert!(log.is_empty());
}

#[test]
fn test_removed_file_is_not_also_moved() {
    let dir = TempDir::new().unwrap();
    let records = vec![
        rec(dir.path(), "asm/boot.s", 1, "; boot\n"),
        rec(dir.path(), "docs/boot.s", 1, "; boot\n"),
    ];
    let (groups, _) = group_by_hash(&records);
    let policy = Policy::compile(
        &[PolicyRule::new("source-in-docs", r"^docs/.+\.s$", "Source in docs")
            .with_move_to("archive")],
        &[],
    )
    .unwrap();
    let violations = policy.classify_all(&records);
    let scorer = default_scorer();

    let log = Planner::new(dir.path(), &scorer, &no_protection())
        .plan(&records, &groups, &[], &violations);

    // docs/boot.s loses on path order and is removed; no MOVE follows.
    assert_eq!(log.len(), 2);
    assert!(log.actions().iter().all(|a| a.kind != ActionKind::Move));
    assert!(log.is_mutated(&dir.path().join("docs/boot.s")));
}

#[test]
fn test_pairs_resolve_in_order_without_chains() {
    let dir = TempDir::new().unwrap();
    let records = vec![
        rec(dir.path(), "a.c", 1, "one\n"),
        rec(dir.path(), "b.c", 2, "two\n"),
        rec(dir.path(), "c.c", 3, "six\n"),
    ];
    let pair = |a: &str, b: &str| SimilarPair {
        file_a: dir.path().join(a),
        file_b: dir.path().join(b),
        ratio: 0.9,
        size: 4,
    };
    let pairs = vec![pair("a.c", "b.c"), pair("b.c", "c.c"), pair("a.c", "c.c")];
    let scorer = default_scorer();

    let log = Planner::new(dir.path(), &scorer, &no_protection()).plan(&records, &[], &pairs, &[]);

    let removed: Vec<PathBuf> = log
        .actions()
        .iter()
        .filter(|a| a.kind == ActionKind::Remove)
        .map(|a| a.source.clone())
        .collect();
    assert_eq!(removed, vec![dir.path().join("b.c"), dir.path().join("c.c")]);
    for action in log.actions().iter().filter(|a| a.kind == ActionKind::Remove) {
        assert_eq!(action.keeper.as_deref(), Some(dir.path().join("a.c").as_path()));
    }
}

#[test]
fn test_protect_list_from_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("KEEPME.txt"), "same\n").unwrap();
    fs::write(dir.path().join("other.txt"), "same\n").unwrap();

    let mut config = EngineConfig::default();
    config.protected_filenames.push("keepme".into());
    let report = Engine::new(config).run(dir.path()).unwrap();

    assert_eq!(report.actions.len(), 2);
    assert!(report.actions.iter().all(|a| a.kind == ActionKind::Keep));
}

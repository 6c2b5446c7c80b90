use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;
use treetidy::actions::Executor;
use treetidy::cli::Cli;
use treetidy::config::{EngineConfig, Mode};
use treetidy::duplicates::group_by_hash;
use treetidy::engine::{Engine, EngineError};
use treetidy::error::{ExitCode, RunStatus};
use treetidy::output::Report;
use treetidy::plan::{ActionKind, Outcome, Planner, Preflight, PreflightError};
use treetidy::scanner::{Index, Indexer, IndexerConfig};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn permanent() -> EngineConfig {
    EngineConfig {
        use_trash: false,
        ..EngineConfig::default()
    }
}

fn live() -> EngineConfig {
    EngineConfig {
        mode: Mode::Live,
        ..permanent()
    }
}

fn dry_run_preflight(root: &Path) -> Preflight {
    let report = Engine::new(permanent()).run(root).unwrap();
    Preflight::from_actions(&report.root, &report.actions)
}

/// Index `root` and plan exact-duplicate removals, as the engine would.
fn index_and_plan(root: &Path) -> (Index, treetidy::plan::ActionLog) {
    let index = Indexer::new(IndexerConfig::default()).index(root).unwrap();
    let (groups, _) = group_by_hash(&index.records);
    let scorer = EngineConfig::default().compile_scorer().unwrap();
    let log = Planner::new(&index.root, &scorer, &[]).plan(&index.records, &groups, &[], &[]);
    (index, log)
}

#[test]
fn test_live_run_removes_losers() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/x.c", "int x;\n");
    write(dir.path(), "b/x.c", "int x;\n");
    write(dir.path(), "c/x.c", "int x;\n");

    let preflight = dry_run_preflight(dir.path());
    let report = Engine::new(live())
        .with_preflight(preflight)
        .run(dir.path())
        .unwrap();

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.mode, Mode::Live);
    assert!(dir.path().join("a/x.c").exists());
    assert!(!dir.path().join("b/x.c").exists());
    assert!(!dir.path().join("c/x.c").exists());
    assert_eq!(report.summary.bytes_removed, 14);
    assert!(report.actions.iter().all(|a| a.outcome == Outcome::Applied));
}

#[test]
fn test_live_run_moves_misplaced_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "docs/boot.s", "; boot\n");

    let preflight = dry_run_preflight(dir.path());
    let report = Engine::new(live())
        .with_preflight(preflight)
        .run(dir.path())
        .unwrap();

    assert_eq!(report.summary.actions.r#move, 1);
    assert_eq!(report.summary.bytes_moved, 7);
    assert!(!dir.path().join("docs/boot.s").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("archive/reorganized/boot.s")).unwrap(),
        "; boot\n"
    );
}

#[test]
fn test_live_requires_preflight() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.c", "same\n");
    write(dir.path(), "b.c", "same\n");

    let err = Engine::new(live()).run(dir.path()).unwrap_err();

    assert!(matches!(err, EngineError::PreflightRequired));
    assert!(dir.path().join("b.c").exists());
}

#[test]
fn test_stale_preflight_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.c", "same\n");
    write(dir.path(), "b.c", "same\n");
    let preflight = dry_run_preflight(dir.path());

    // The tree changes between review and apply.
    write(dir.path(), "c.c", "same\n");

    let err = Engine::new(live())
        .with_preflight(preflight)
        .run(dir.path())
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Preflight(PreflightError::LengthMismatch {
            expected: 2,
            found: 3
        })
    ));
    for name in ["a.c", "b.c", "c.c"] {
        assert!(dir.path().join(name).exists());
    }
}

#[test]
fn test_preflight_for_other_root_rejected() {
    let dir = TempDir::new().unwrap();
    let other = TempDir::new().unwrap();
    write(dir.path(), "a.c", "same\n");
    write(other.path(), "a.c", "same\n");
    let preflight = dry_run_preflight(other.path());

    let err = Engine::new(live())
        .with_preflight(preflight)
        .run(dir.path())
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Preflight(PreflightError::RootMismatch { .. })
    ));
}

#[test]
fn test_modified_file_fails_and_halts_group() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.c", "same\n");
    write(dir.path(), "b.c", "same\n");
    write(dir.path(), "c.c", "same\n");
    write(dir.path(), "p.c", "pair\n");
    write(dir.path(), "q.c", "pair\n");
    let (index, mut log) = index_and_plan(dir.path());

    // b.c changes after indexing.
    fs::write(dir.path().join("b.c"), "different size\n").unwrap();

    let summary = Executor::new(true).apply(&mut log, &index.records);

    let outcome = |name: &str| {
        let path = index.root.join(name);
        log.actions()
            .iter()
            .find(|a| a.source == path && a.kind != ActionKind::Keep)
            .map(|a| a.outcome.clone())
            .unwrap()
    };
    assert!(outcome("b.c").is_failed());
    assert_eq!(
        outcome("c.c"),
        Outcome::Skipped {
            reason: "earlier action in dup-1 failed".to_string()
        }
    );
    // The other group still runs.
    assert_eq!(outcome("q.c"), Outcome::Applied);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);

    assert!(dir.path().join("b.c").exists());
    assert!(dir.path().join("c.c").exists());
    assert!(!dir.path().join("q.c").exists());
}

#[test]
fn test_missing_keeper_blocks_removal() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.c", "same\n");
    write(dir.path(), "b.c", "same\n");
    let (index, mut log) = index_and_plan(dir.path());

    fs::remove_file(dir.path().join("a.c")).unwrap();
    let summary = Executor::new(true).apply(&mut log, &index.records);

    assert_eq!(summary.failed, 1);
    assert!(dir.path().join("b.c").exists());
    match &log.actions()[1].outcome {
        Outcome::Failed { error } => assert!(error.contains("Keeper")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_vanished_file_fails_without_stopping_run() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.c", "same\n");
    write(dir.path(), "b.c", "same\n");
    write(dir.path(), "x.c", "other\n");
    write(dir.path(), "y.c", "other\n");
    let (index, mut log) = index_and_plan(dir.path());

    fs::remove_file(dir.path().join("b.c")).unwrap();
    let summary = Executor::new(true).apply(&mut log, &index.records);

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.applied, 3);
    assert!(!dir.path().join("y.c").exists());
}

#[test]
fn test_interrupt_skips_remaining_actions() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.c", "same\n");
    write(dir.path(), "b.c", "same\n");
    let (index, mut log) = index_and_plan(dir.path());

    let flag = Arc::new(AtomicBool::new(true));
    let summary = Executor::new(true)
        .with_shutdown_flag(flag)
        .apply(&mut log, &index.records);

    assert!(summary.interrupted);
    assert_eq!(summary.skipped, 2);
    assert!(log.actions().iter().all(|a| a.outcome
        == Outcome::Skipped {
            reason: "interrupted".to_string()
        }));
    assert!(dir.path().join("b.c").exists());
}

#[test]
fn test_cli_plan_then_apply() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let report_path: PathBuf = out.path().join("plan.json");
    write(dir.path(), "a/x.c", "int x;\n");
    write(dir.path(), "b/x.c", "int x;\n");
    let root = dir.path().to_str().unwrap();
    let report_arg = report_path.to_str().unwrap();

    let plan = Cli::parse_from(["treetidy", "-q", "plan", root, "--report", report_arg]);
    assert_eq!(treetidy::run_app(plan).unwrap(), ExitCode::Success);
    assert!(dir.path().join("b/x.c").exists());

    let reviewed = Report::read_from_file(&report_path).unwrap();
    assert_eq!(reviewed.mode, Mode::DryRun);
    assert_eq!(reviewed.summary.actions.remove, 1);

    let apply = Cli::parse_from([
        "treetidy",
        "-q",
        "apply",
        root,
        "--preflight",
        report_arg,
        "--permanent",
    ]);
    assert_eq!(treetidy::run_app(apply).unwrap(), ExitCode::Success);
    assert!(dir.path().join("a/x.c").exists());
    assert!(!dir.path().join("b/x.c").exists());
}

#[test]
fn test_cli_apply_with_missing_preflight_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_str().unwrap();
    let missing = dir.path().join("nope.json");

    let apply = Cli::parse_from([
        "treetidy",
        "-q",
        "apply",
        root,
        "--preflight",
        missing.to_str().unwrap(),
    ]);
    let err = treetidy::run_app(apply).unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::GeneralError);
}

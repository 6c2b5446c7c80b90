use std::fs;
use std::path::Path;
use tempfile::TempDir;
use treetidy::config::EngineConfig;
use treetidy::engine::{Engine, EngineError};
use treetidy::plan::ActionKind;
use treetidy::scanner::{Indexer, IndexerConfig, ScanError, Walker, WalkerConfig};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_scan_nested_tree() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/b/c/deep.c", "deep\n");
    write(dir.path(), "a/shallow.c", "deep\n");
    write(dir.path(), "top.c", "top\n");

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(report.summary.total_files, 3);
    assert_eq!(report.summary.total_bytes, 14);
    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(report.files.len(), 3);
    assert!(report.files.iter().all(|f| f.hash.is_some()));
}

#[test]
fn test_walk_order_is_stable() {
    let dir = TempDir::new().unwrap();
    for name in ["zeta.c", "alpha.c", "mid/beta.c", "mid/alpha.c"] {
        write(dir.path(), name, "x\n");
    }

    let walk = || -> Vec<_> {
        Walker::new(dir.path(), WalkerConfig::default())
            .walk()
            .map(|r| r.unwrap().path)
            .collect()
    };
    assert_eq!(walk(), walk());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_duplicates() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "real.c", "int real;\n");
    std::os::unix::fs::symlink(dir.path().join("real.c"), dir.path().join("link.c")).unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("sublink")).unwrap();

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(report.summary.total_files, 1);
    assert!(report.duplicate_groups.is_empty());
    assert!(report.actions.is_empty());
}

#[test]
fn test_exclude_patterns_hide_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.c", "same\n");
    write(dir.path(), "vendor/a.c", "same\n");
    write(dir.path(), "build.log", "same\n");

    let config = EngineConfig {
        exclude_patterns: vec!["vendor/".into(), "*.log".into()],
        ..EngineConfig::default()
    };
    let report = Engine::new(config).run(dir.path()).unwrap();

    assert_eq!(report.summary.total_files, 1);
    assert!(report.duplicate_groups.is_empty());
}

#[test]
fn test_root_gitignore_is_honoured() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".gitignore", "generated/\n");
    write(dir.path(), "generated/a.c", "same\n");
    write(dir.path(), "a.c", "same\n");

    let index = Indexer::new(IndexerConfig::default())
        .index(dir.path())
        .unwrap();

    let rels: Vec<_> = index.records.iter().map(|r| r.relative_path.as_str()).collect();
    assert_eq!(rels, vec![".gitignore", "a.c"]);
}

#[test]
fn test_skip_hidden() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".cache/a.c", "same\n");
    write(dir.path(), ".hidden.c", "same\n");
    write(dir.path(), "a.c", "same\n");

    let visible = Engine::new(EngineConfig {
        skip_hidden: true,
        ..EngineConfig::default()
    })
    .run(dir.path())
    .unwrap();
    assert_eq!(visible.summary.total_files, 1);

    let all = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    assert_eq!(all.summary.total_files, 3);
    assert_eq!(all.duplicate_groups[0].len(), 3);
}

#[test]
fn test_binary_files_group_but_never_pair() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.bin"), [0u8, 1, 2, 3, 4]).unwrap();
    fs::write(dir.path().join("b.bin"), [0u8, 1, 2, 3, 4]).unwrap();
    fs::write(dir.path().join("c.bin"), [0u8, 1, 2, 3, 5]).unwrap();

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();

    assert_eq!(report.duplicate_groups.len(), 1);
    assert!(report.similar_pairs.is_empty());
    assert_eq!(report.summary.comparisons, 0);
}

#[test]
fn test_decomposed_unicode_matches_preferred_directory() {
    let dir = TempDir::new().unwrap();
    // "café/" written in NFD on disk, NFC in the config.
    write(dir.path(), "cafe\u{0301}/x.c", "int x;\n");
    write(dir.path(), "other/x.c", "int x;\n");

    let config = EngineConfig {
        preferred_directories: vec!["caf\u{00e9}/".into()],
        ..EngineConfig::default()
    };
    let report = Engine::new(config).run(dir.path()).unwrap();

    let keep = report
        .actions
        .iter()
        .find(|a| a.kind == ActionKind::Keep)
        .unwrap();
    assert!(keep.source.to_string_lossy().contains("cafe\u{0301}"));
}

#[test]
fn test_missing_root_fails_run() {
    let dir = TempDir::new().unwrap();
    let err = Engine::new(EngineConfig::default())
        .run(&dir.path().join("missing"))
        .unwrap_err();

    assert!(matches!(err, EngineError::Root(ScanError::NotFound(_))));
}

#[test]
fn test_root_must_be_directory() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "file.c", "x\n");

    let err = Engine::new(EngineConfig::default())
        .run(&dir.path().join("file.c"))
        .unwrap_err();

    assert!(matches!(err, EngineError::Root(ScanError::NotADirectory(_))));
}

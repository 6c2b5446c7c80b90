use filetime::FileTime;
use std::fs;
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::tempdir;
use treetidy::cache::{CacheError, HashCache};
use treetidy::config::EngineConfig;
use treetidy::engine::Engine;

#[test]
fn test_report_reuse_skips_hashing() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let report_path = out.path().join("report.json");
    fs::write(dir.path().join("file1.txt"), "duplicate content").unwrap();
    fs::write(dir.path().join("file2.txt"), "duplicate content").unwrap();
    fs::write(dir.path().join("file3.txt"), "unique").unwrap();

    let first = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    assert_eq!(first.summary.cache_hits, 0);
    assert_eq!(first.summary.cache_misses, 3);
    first.write_to_file(&report_path).unwrap();

    let cache = Arc::new(HashCache::from_report_file(&report_path).unwrap());
    assert_eq!(cache.len(), 3);
    let second = Engine::new(EngineConfig::default())
        .with_cache(cache)
        .run(dir.path())
        .unwrap();

    assert_eq!(second.summary.cache_hits, 3);
    assert_eq!(second.summary.cache_misses, 0);
    assert_eq!(second.duplicate_groups, first.duplicate_groups);
    assert_eq!(second.actions, first.actions);
}

#[test]
fn test_mtime_change_invalidates_entry() {
    let dir = tempdir().unwrap();
    let file1 = dir.path().join("file1.txt");
    let file2 = dir.path().join("file2.txt");
    fs::write(&file1, "aaaa").unwrap();
    fs::write(&file2, "aaaa").unwrap();

    let first = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    let cache = Arc::new(HashCache::from_entries(first.files.clone()));

    // Same size, new content, new mtime.
    fs::write(&file2, "bbbb").unwrap();
    let later = FileTime::from_unix_time(2_000_000_000, 0);
    filetime::set_file_mtime(&file2, later).unwrap();

    let second = Engine::new(EngineConfig::default())
        .with_cache(cache)
        .run(dir.path())
        .unwrap();

    assert_eq!(second.summary.cache_hits, 1);
    assert_eq!(second.summary.cache_misses, 1);
    assert!(second.duplicate_groups.is_empty());
}

#[test]
fn test_unchanged_metadata_trusts_cache() {
    let dir = tempdir().unwrap();
    let file1 = dir.path().join("file1.txt");
    let file2 = dir.path().join("file2.txt");
    fs::write(&file1, "aaaa").unwrap();
    fs::write(&file2, "bbbb").unwrap();
    let pinned = FileTime::from_unix_time(1_600_000_000, 0);
    filetime::set_file_mtime(&file1, pinned).unwrap();
    filetime::set_file_mtime(&file2, pinned).unwrap();

    let first = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    assert!(first.duplicate_groups.is_empty());
    let cache = Arc::new(HashCache::from_entries(first.files.clone()));

    // Rewrite file2 to match file1 but restore its size and mtime: the
    // cache cannot tell, so the stale hash is used.
    fs::write(&file2, "aaaa").unwrap();
    filetime::set_file_mtime(&file2, pinned).unwrap();

    let cached = Engine::new(EngineConfig::default())
        .with_cache(cache)
        .run(dir.path())
        .unwrap();
    assert_eq!(cached.summary.cache_hits, 2);
    assert!(cached.duplicate_groups.is_empty());

    let fresh = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    assert_eq!(fresh.duplicate_groups.len(), 1);
}

#[test]
fn test_deleted_file_entry_is_harmless() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "kept").unwrap();
    fs::write(dir.path().join("gone.txt"), "gone").unwrap();

    let first = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    fs::remove_file(dir.path().join("gone.txt")).unwrap();

    let second = Engine::new(EngineConfig::default())
        .with_cache(Arc::new(HashCache::from_entries(first.files)))
        .run(dir.path())
        .unwrap();

    assert_eq!(second.summary.total_files, 1);
    assert_eq!(second.summary.cache_hits, 1);
}

#[test]
fn test_corrupt_report_is_parse_error() {
    let out = tempdir().unwrap();
    let path = out.path().join("report.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        HashCache::from_report_file(&path),
        Err(CacheError::Parse { .. })
    ));
}

#[test]
fn test_missing_report_is_read_error() {
    let out = tempdir().unwrap();
    assert!(matches!(
        HashCache::from_report_file(&out.path().join("absent.json")),
        Err(CacheError::Read { .. })
    ));
}

#[test]
fn test_cache_lookup_requires_exact_mtime() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    fs::write(&file, "x").unwrap();

    let report = Engine::new(EngineConfig::default()).run(dir.path()).unwrap();
    let entry = &report.files[0];
    let cache = HashCache::from_entries(report.files.clone());

    assert!(cache.lookup(&entry.path, entry.size, entry.modified).is_some());
    assert!(cache.lookup(&entry.path, entry.size + 1, entry.modified).is_none());
    assert!(cache
        .lookup(&entry.path, entry.size, SystemTime::UNIX_EPOCH)
        .is_none());
}

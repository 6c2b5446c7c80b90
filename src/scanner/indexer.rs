//! Indexing: walk, hash and sample every file into [`FileRecord`]s.
//!
//! Discovery is sequential (jwalk already parallelizes readdir); hashing runs
//! on a bounded rayon pool sized by `io_threads` so a wide tree does not
//! saturate the disk with random reads. Each worker returns its record and
//! the pool's `collect` acts as the reducer. Per-file failures become
//! unreadable records rather than errors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::hasher::{Hasher, DEFAULT_SAMPLE_BYTES};
use super::path_utils::relative_key;
use super::walker::{WalkedFile, Walker};
use super::{FileRecord, HashError, ScanError, WalkerConfig};
use crate::cache::HashCache;
use crate::progress::ProgressCallback;

/// Default number of hashing workers.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Configuration for the indexer.
#[derive(Clone)]
pub struct IndexerConfig {
    /// Number of hashing workers.
    pub io_threads: usize,
    /// Bytes captured per file as the text sample.
    pub sample_bytes: usize,
    /// Walker options (hidden files, exclusions).
    pub walker: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Hashes reused from a previous report.
    pub cache: Option<Arc<HashCache>>,
}

impl fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("io_threads", &self.io_threads)
            .field("sample_bytes", &self.sample_bytes)
            .field("walker", &self.walker)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress_callback", &self.progress_callback.is_some())
            .field("cache", &self.cache.as_ref().map(|c| c.len()))
            .finish()
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            sample_bytes: DEFAULT_SAMPLE_BYTES,
            walker: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
            cache: None,
        }
    }
}

impl IndexerConfig {
    /// Set the number of hashing workers (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the sample size in bytes.
    #[must_use]
    pub fn with_sample_bytes(mut self, bytes: usize) -> Self {
        self.sample_bytes = bytes;
        self
    }

    /// Set walker options.
    #[must_use]
    pub fn with_walker(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Reuse hashes from a previous report.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<HashCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Counters collected while indexing.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Regular files discovered
    pub total_files: usize,
    /// Sum of their sizes
    pub total_bytes: u64,
    /// Files that could not be hashed
    pub unreadable_files: usize,
    /// Hashes reused from the cache
    pub cache_hits: usize,
    /// Hashes computed from disk
    pub cache_misses: usize,
    /// Walk-level errors (unlistable directories, vanished entries)
    pub scan_errors: Vec<ScanError>,
    /// Whether shutdown interrupted indexing
    pub interrupted: bool,
}

/// The result of an index pass.
#[derive(Debug, Clone)]
pub struct Index {
    /// Scan root
    pub root: PathBuf,
    /// One record per regular file, sorted by path
    pub records: Vec<FileRecord>,
    /// Counters
    pub stats: IndexStats,
}

/// Turns a directory tree into an inventory of [`FileRecord`]s.
#[derive(Debug, Default)]
pub struct Indexer {
    config: IndexerConfig,
}

/// Per-file worker output.
enum Indexed {
    Record { record: FileRecord, cache_hit: bool },
    Skipped,
}

impl Indexer {
    /// Create an indexer.
    #[must_use]
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    /// Index every regular file under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] only if `root` itself is missing, unreadable or
    /// not a directory. Everything below the root is recorded, not raised.
    pub fn index(&self, root: &Path) -> Result<Index, ScanError> {
        let root = validate_root(root)?;
        let mut stats = IndexStats::default();

        let files = self.discover(&root, &mut stats);
        if self.config.is_shutdown_requested() {
            stats.interrupted = true;
            log::info!("Indexing interrupted during discovery");
            return Ok(Index {
                root,
                records: Vec::new(),
                stats,
            });
        }

        let mut records = self.hash_all(&root, files, &mut stats);
        records.sort_by(|a, b| a.path.cmp(&b.path));

        if self.config.is_shutdown_requested() {
            stats.interrupted = true;
            log::info!("Indexing interrupted during hashing");
        }

        log::info!(
            "Indexed {} files ({} bytes), {} unreadable, {} cache hits",
            stats.total_files,
            stats.total_bytes,
            stats.unreadable_files,
            stats.cache_hits
        );

        Ok(Index {
            root,
            records,
            stats,
        })
    }

    fn discover(&self, root: &Path, stats: &mut IndexStats) -> Vec<WalkedFile> {
        let callback = self.config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_phase_start("walking", 0);
        }

        let mut walker = Walker::new(root, self.config.walker.clone());
        if let Some(flag) = &self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        let mut files = Vec::new();
        for entry in walker.walk() {
            match entry {
                Ok(file) => {
                    stats.total_files += 1;
                    stats.total_bytes += file.size;
                    if let Some(cb) = callback {
                        cb.on_progress(files.len() + 1, &file.path.to_string_lossy());
                    }
                    files.push(file);
                }
                Err(e) => stats.scan_errors.push(e),
            }
        }

        if let Some(cb) = callback {
            cb.on_phase_end("walking");
        }
        log::debug!(
            "Discovered {} files, {} walk errors",
            files.len(),
            stats.scan_errors.len()
        );
        files
    }

    fn hash_all(
        &self,
        root: &Path,
        files: Vec<WalkedFile>,
        stats: &mut IndexStats,
    ) -> Vec<FileRecord> {
        let config = &self.config;
        let callback = config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_phase_start("indexing", files.len());
        }

        let mut hasher = Hasher::new().with_sample_bytes(config.sample_bytes);
        if let Some(flag) = &config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        let done = AtomicUsize::new(0);

        let results: Vec<Indexed> = run_on_io_pool(config.io_threads, || {
            files
                .into_par_iter()
                .map(|file| {
                    if config.is_shutdown_requested() {
                        return Indexed::Skipped;
                    }
                    let indexed = index_one(root, file, &hasher, config.cache.as_deref());
                    if let (Some(cb), Indexed::Record { record, .. }) = (callback, &indexed) {
                        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                        cb.on_progress(n, &record.relative_path);
                    }
                    indexed
                })
                .collect()
        });

        let mut records = Vec::with_capacity(results.len());
        for result in results {
            let Indexed::Record { record, cache_hit } = result else {
                continue;
            };
            if !record.is_readable() {
                stats.unreadable_files += 1;
            } else if cache_hit {
                stats.cache_hits += 1;
            } else {
                stats.cache_misses += 1;
            }
            records.push(record);
        }

        if let Some(cb) = callback {
            cb.on_phase_end("indexing");
        }
        records
    }
}

fn index_one(
    root: &Path,
    file: WalkedFile,
    hasher: &Hasher,
    cache: Option<&HashCache>,
) -> Indexed {
    let relative = relative_key(root, &file.path);

    if let Some(hash) = cache.and_then(|c| c.lookup(&file.path, file.size, file.modified)) {
        log::trace!("Cache hit: {}", file.path.display());
        return match hasher.sample(&file.path) {
            Ok(sample) => Indexed::Record {
                record: FileRecord::new(file.path, relative, file.size, hash, file.modified)
                    .with_sample(sample),
                cache_hit: true,
            },
            Err(e) => unreadable(file, relative, &e),
        };
    }

    match hasher.hash_and_sample(&file.path) {
        Ok((hash, sample)) => {
            log::trace!("Hashed: {}", file.path.display());
            Indexed::Record {
                record: FileRecord::new(file.path, relative, file.size, hash, file.modified)
                    .with_sample(sample),
                cache_hit: false,
            }
        }
        Err(HashError::Interrupted(_)) => Indexed::Skipped,
        Err(e) => unreadable(file, relative, &e),
    }
}

fn unreadable(file: WalkedFile, relative: String, error: &HashError) -> Indexed {
    log::warn!("Unreadable: {}", error);
    Indexed::Record {
        record: FileRecord::unreadable(
            file.path,
            relative,
            file.size,
            file.modified,
            error.to_string(),
        ),
        cache_hit: false,
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::NotFound(root.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(root.to_path_buf()),
        _ => ScanError::Io {
            path: root.to_path_buf(),
            source: Arc::new(e),
        },
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    Ok(root.canonicalize().unwrap_or_else(|_| root.to_path_buf()))
}

/// Run `job` inside a rayon pool with `threads` workers.
///
/// Falls back to the global pool if the dedicated one cannot be built.
pub(crate) fn run_on_io_pool<R, F>(threads: usize, job: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(job),
        Err(e) => {
            log::warn!(
                "Failed to create worker pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            job()
        }
    }
}

//! Incremental system indexer.
//!
//! # Overview
//!
//! The [`Indexer`] orchestrates a full index (first run, or when forced)
//! or a diff-based incremental update against the metadata store:
//!
//! - `LoadingCache`: the prior index is read from the store. Below the
//!   cache threshold, or when a full index was requested, a full scan
//!   runs instead. Otherwise the cached snapshot is served to consumers
//!   immediately and the incremental pass runs as background refinement.
//! - `FullScan`: walks every available root, building a record for each
//!   non-excluded file and persisting in bounded batches.
//! - `IncrementalScan`: re-walks the roots and diffs each path against
//!   cached metadata; only new and changed records are re-recorded, and
//!   cached paths not observed by the completed walk are pruned.
//!
//! Every run opens its own exclusive store connection from the database
//! path; connections are never shared across tasks.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::EngineError;
use crate::events::EventSink;
use crate::index::{FileRecord, IndexSnapshot};
use crate::signal::{is_cancelled, CancelFlag};
use crate::store::MetadataStore;
use crate::walker::{Walker, WalkerConfig};

/// Records persisted per store transaction during a full scan.
pub const INDEX_BATCH_SIZE: usize = 500;

/// Cached-index size below which a full scan is preferred over an
/// incremental update.
pub const CACHE_THRESHOLD: usize = 1000;

/// Paths checked between progress messages during an incremental scan.
pub const CHECK_PROGRESS_INTERVAL: usize = 1000;

/// Which scan strategy a completed run used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Every file was re-recorded from scratch.
    Full,
    /// Only deltas against the cached index were recorded.
    Incremental,
}

/// Indexer tuning knobs.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Ignore the cache and re-index everything.
    pub force_full: bool,
    /// Minimum cached entries required to run incrementally.
    pub cache_threshold: usize,
    /// Full-scan persistence batch size.
    pub batch_size: usize,
    /// Modification-time delta (seconds) treated as unchanged, absorbing
    /// filesystem timestamp granularity.
    pub mtime_tolerance: f64,
    /// Incremental-scan paths checked between progress messages.
    pub progress_interval: usize,
    /// Traversal filtering.
    pub walker: WalkerConfig,
    /// Roots to index. `None` discovers them via [`available_roots`].
    pub roots: Option<Vec<PathBuf>>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            force_full: false,
            cache_threshold: CACHE_THRESHOLD,
            batch_size: INDEX_BATCH_SIZE,
            mtime_tolerance: 1.0,
            progress_interval: CHECK_PROGRESS_INTERVAL,
            walker: WalkerConfig::default(),
            roots: None,
        }
    }
}

/// Terminal result of a completed indexing run.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    /// The published immutable snapshot. Fully replaces any prior one.
    pub snapshot: Arc<IndexSnapshot>,
    /// Strategy the run used.
    pub mode: ScanMode,
    /// Records newly added to the index.
    pub added: usize,
    /// Records refreshed because size or mtime changed.
    pub updated: usize,
    /// Cached records dropped because their path no longer exists.
    pub pruned: usize,
}

impl IndexOutcome {
    /// Terminal file count of the published snapshot.
    #[must_use]
    pub fn total(&self) -> usize {
        self.snapshot.len()
    }
}

/// The filesystem roots to index: every mounted drive on Windows, the
/// single root filesystem elsewhere.
#[must_use]
pub fn available_roots() -> Vec<PathBuf> {
    if cfg!(windows) {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let mut roots: Vec<PathBuf> = disks
            .iter()
            .map(|d| d.mount_point().to_path_buf())
            .collect();
        roots.sort();
        roots.dedup();
        if roots.is_empty() {
            roots.push(PathBuf::from("C:\\"));
        }
        roots
    } else {
        vec![PathBuf::from("/")]
    }
}

/// Background indexing task over a metadata database.
pub struct Indexer {
    db_path: PathBuf,
    config: IndexerConfig,
    cancel: Option<CancelFlag>,
}

impl Indexer {
    /// Create an indexer for the database at `db_path`.
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            config: IndexerConfig::default(),
            cancel: None,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: IndexerConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a cooperative cancel flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(is_cancelled)
    }

    fn roots(&self) -> Result<Vec<PathBuf>, EngineError> {
        match &self.config.roots {
            Some(roots) => {
                for root in roots {
                    if !root.is_dir() {
                        return Err(EngineError::InvalidRoot(root.clone()));
                    }
                }
                Ok(roots.clone())
            }
            None => Ok(available_roots()),
        }
    }

    fn walker(&self, roots: Vec<PathBuf>) -> Walker {
        let mut walker = Walker::new(roots).with_config(self.config.walker.clone());
        if let Some(ref flag) = self.cancel {
            walker = walker.with_cancel_flag(Arc::clone(flag));
        }
        walker
    }

    /// Run the indexing state machine to a terminal state.
    ///
    /// Opens an exclusive store connection for the lifetime of the run.
    /// Per-path stat errors are skipped and never escalate; store errors
    /// terminate the run.
    ///
    /// # Errors
    ///
    /// [`EngineError::Store`] on persistence failure,
    /// [`EngineError::InvalidRoot`] for a caller-supplied root that is
    /// not a directory, and [`EngineError::Cancelled`] when the cancel
    /// flag was raised mid-scan.
    pub fn run(&self, sink: &dyn EventSink) -> Result<IndexOutcome, EngineError> {
        let roots = self.roots()?;
        let mut store = MetadataStore::open(&self.db_path)?;

        if !self.config.force_full {
            sink.on_progress("Loading cached index...");
            let cached = store.load_all()?;
            if cached.len() >= self.config.cache_threshold {
                log::info!("loaded {} files from cache", cached.len());
                sink.on_progress(&format!("Loaded {} files from cache", cached.len()));
                sink.on_count(cached.len() as u64);
                // Serve the cached snapshot to consumers right away; the
                // incremental walk below refines it.
                sink.on_batch(&cached);
                return self.incremental_scan(&mut store, cached, roots, sink);
            }
        }

        self.full_scan(&mut store, roots, sink)
    }

    fn full_scan(
        &self,
        store: &mut MetadataStore,
        roots: Vec<PathBuf>,
        sink: &dyn EventSink,
    ) -> Result<IndexOutcome, EngineError> {
        let mut index: Vec<FileRecord> = Vec::new();
        let mut batch: Vec<FileRecord> = Vec::with_capacity(self.config.batch_size);
        let mut total: u64 = 0;

        for root in roots {
            sink.on_progress(&format!("Indexing {}...", root.display()));
            log::info!("full scan of {}", root.display());

            let walker = self.walker(vec![root]);
            for result in walker.walk() {
                let record = match result {
                    Ok(record) => record,
                    // Stat failures on single paths are skipped.
                    Err(err) => {
                        log::trace!("skipping path: {err}");
                        continue;
                    }
                };
                index.push(record.clone());
                batch.push(record);
                total += 1;

                if batch.len() >= self.config.batch_size {
                    store.save_batch(&batch)?;
                    batch.clear();
                    sink.on_count(total);
                }
            }
            if self.cancelled() {
                break;
            }
        }

        // Already-persisted batches stay valid even when cancelled; the
        // next incremental pass restores consistency.
        store.save_batch(&batch)?;

        if self.cancelled() {
            return Err(EngineError::Cancelled);
        }

        sink.on_count(total);
        log::info!("full scan complete: {total} files");
        Ok(IndexOutcome {
            added: index.len(),
            snapshot: Arc::new(IndexSnapshot::from_records(index)),
            mode: ScanMode::Full,
            updated: 0,
            pruned: 0,
        })
    }

    fn incremental_scan(
        &self,
        store: &mut MetadataStore,
        cached: Vec<FileRecord>,
        roots: Vec<PathBuf>,
        sink: &dyn EventSink,
    ) -> Result<IndexOutcome, EngineError> {
        sink.on_progress("Checking for changes...");

        let indexed_paths = store.all_paths()?;
        let mut index = cached;
        let positions: HashMap<PathBuf, usize> = index
            .iter()
            .enumerate()
            .map(|(i, r)| (r.path.clone(), i))
            .collect();

        let mut observed: HashSet<PathBuf> = HashSet::new();
        let mut new_files: Vec<FileRecord> = Vec::new();
        let mut updated_files: Vec<FileRecord> = Vec::new();
        let mut checked: usize = 0;

        let walker = self.walker(roots);
        for result in walker.walk() {
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    log::trace!("skipping path: {err}");
                    continue;
                }
            };
            observed.insert(record.path.clone());

            if !indexed_paths.contains(&record.path) {
                new_files.push(record.clone());
                index.push(record);
            } else if let Some(meta) = store.metadata_for(&record.path)? {
                let changed = record.size != meta.size
                    || (record.modified - meta.modified).abs() > self.config.mtime_tolerance;
                if changed {
                    updated_files.push(record.clone());
                    if let Some(&i) = positions.get(&record.path) {
                        index[i] = record;
                    }
                }
            }

            checked += 1;
            if checked % self.config.progress_interval == 0 {
                sink.on_progress(&format!("Checked {checked} files..."));
            }
        }

        // Dirty records persist even on cancellation (at-least-once
        // visibility); pruning requires a completed traversal.
        if !new_files.is_empty() {
            store.save_batch(&new_files)?;
            sink.on_progress(&format!("Added {} new files", new_files.len()));
        }
        if !updated_files.is_empty() {
            store.save_batch(&updated_files)?;
            sink.on_progress(&format!("Updated {} files", updated_files.len()));
        }

        if self.cancelled() {
            return Err(EngineError::Cancelled);
        }

        let pruned = store.prune_except(&observed)?;
        index.retain(|r| observed.contains(&r.path));

        let total = index.len() as u64;
        sink.on_count(total);
        log::info!(
            "incremental scan complete: {} files ({} added, {} updated, {} pruned)",
            total,
            new_files.len(),
            updated_files.len(),
            pruned
        );

        Ok(IndexOutcome {
            added: new_files.len(),
            updated: updated_files.len(),
            pruned,
            snapshot: Arc::new(IndexSnapshot::from_records(index)),
            mode: ScanMode::Incremental,
        })
    }
}

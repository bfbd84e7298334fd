//! Index data model: file records and immutable snapshots.
//!
//! The [`IndexSnapshot`] is the engine's only shared state. It is built
//! privately by the indexer and published behind an `Arc` on completion
//! or at checkpoints; once published it is never mutated again. A new
//! snapshot fully replaces the old one (copy-on-handoff).

pub mod indexer;
pub mod search;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub use indexer::{available_roots, IndexOutcome, Indexer, IndexerConfig, ScanMode};
pub use search::{search_snapshot, SearchQuery, SearchSummary};

/// One indexed filesystem entry.
///
/// `path` is the unique identifier and the store's primary key.
/// `extension` is derived deterministically from `name` and is never
/// stored inconsistently with it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Absolute path, unique across the whole index.
    pub path: PathBuf,
    /// File name component.
    pub name: String,
    /// Lower-cased extension including the leading dot, or empty.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub modified: f64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl FileRecord {
    /// Build a record from a path and stat data, deriving `name` and
    /// `extension`.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: f64, is_dir: bool) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&name);
        Self {
            path,
            name,
            extension,
            size,
            modified,
            is_dir,
        }
    }
}

/// Derive the lower-cased extension (with leading dot) from a file name.
///
/// Follows splitext semantics: the final dot segment, where the dot must
/// be preceded by at least one non-dot character. `".bashrc"` and `"..."`
/// therefore have no extension.
#[must_use]
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 && name[..idx].chars().any(|c| c != '.') => {
            name[idx..].to_lowercase()
        }
        _ => String::new(),
    }
}

/// Convert a modification time to seconds since the Unix epoch.
///
/// Times before the epoch clamp to zero.
#[must_use]
pub fn mtime_secs(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Immutable point-in-time view of the indexed file collection.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    records: Vec<FileRecord>,
}

impl IndexSnapshot {
    /// Wrap an ordered record collection.
    #[must_use]
    pub fn from_records(records: Vec<FileRecord>) -> Self {
        Self { records }
    }

    /// The records in index order.
    #[must_use]
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by its path key.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.path == path)
    }
}

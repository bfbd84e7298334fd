//! Duplicate detection: grouping model and the two scanners.
//!
//! [`fast`] groups by normalized filename (copy-suffix stripping),
//! trading accuracy for speed; [`deep`] groups by content hash within
//! size buckets. Both emit [`DuplicateGroup`]s of two or more members.

pub mod deep;
pub mod fast;

use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use crate::index::FileRecord;

pub use deep::{DeepScanConfig, DeepScanner, HashAlgorithm};
pub use fast::{normalize_filename, FastScanConfig, FastScanner};

/// One member of a duplicate group.
///
/// Identity is the path alone: two members with the same path are the
/// same file regardless of observed metadata.
#[derive(Debug, Clone)]
pub struct DuplicateFile {
    /// Absolute path.
    pub path: PathBuf,
    /// File name component.
    pub name: String,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub modified: f64,
    /// Hex content digest, set only by the deep scanner.
    pub hash: Option<String>,
}

impl DuplicateFile {
    /// Build a member from an indexed record.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            name: record.name.clone(),
            size: record.size,
            modified: record.modified,
            hash: None,
        }
    }
}

impl PartialEq for DuplicateFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for DuplicateFile {}

impl Hash for DuplicateFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// A set of files considered duplicates of one another.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    /// The grouping key: a normalized name for fast scans, a hex digest
    /// for deep scans.
    pub key: String,
    /// Group members, at least two.
    pub files: Vec<DuplicateFile>,
}

impl DuplicateGroup {
    /// Wrap a key and its members.
    #[must_use]
    pub fn new(key: String, files: Vec<DuplicateFile>) -> Self {
        Self { key, files }
    }

    /// Number of members.
    #[must_use]
    pub fn count(&self) -> usize {
        self.files.len()
    }

    /// Sum of member sizes in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Bytes reclaimable by keeping one largest member and deleting the
    /// rest. For `{100, 100, 300}` this is 200: the first member holding
    /// the maximum size is the one retained.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        let largest = self.files.iter().map(|f| f.size).max().unwrap_or(0);
        self.total_size() - largest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn member(path: &str, size: u64) -> DuplicateFile {
        DuplicateFile {
            path: PathBuf::from(path),
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            size,
            modified: 0.0,
            hash: None,
        }
    }

    #[test]
    fn identity_is_path_only() {
        let a = member("/x/a.txt", 10);
        let mut b = member("/x/a.txt", 999);
        b.hash = Some("abc".to_string());
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn wasted_space_keeps_one_largest_member() {
        let group = DuplicateGroup::new(
            "report.txt".to_string(),
            vec![
                member("/a", 100),
                member("/b", 100),
                member("/c", 300),
            ],
        );
        assert_eq!(group.total_size(), 500);
        assert_eq!(group.wasted_space(), 200);
        assert_eq!(group.count(), 3);
    }

    #[test]
    fn wasted_space_with_equal_sizes() {
        let group = DuplicateGroup::new(
            "x".to_string(),
            vec![member("/a", 50), member("/b", 50)],
        );
        assert_eq!(group.wasted_space(), 50);
    }
}

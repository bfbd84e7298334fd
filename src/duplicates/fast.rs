//! Filename-based duplicate scanning.
//!
//! The fast scanner never reads file contents. It strips common
//! copy-style suffixes from the filename stem and groups files whose
//! normalized names collide, optionally requiring matching sizes. The
//! result is a likely-duplicate report, not proof of identical content.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::EngineError;
use crate::events::EventSink;
use crate::signal::CancelFlag;
use crate::walker::{Walker, WalkerConfig};

use super::{DuplicateFile, DuplicateGroup};

/// Files scanned between count events.
pub const FAST_PROGRESS_INTERVAL: usize = 100;

/// Copy-suffix patterns stripped from a filename stem, in priority
/// order. Each applies at most once per name.
static COPY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\s*\(\d+\)$",
        r"\s*-\s*Copy$",
        r"\s*Copy$",
        r"_copy$",
        r"\s*-\s*\d+$",
        r"_\d+$",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid copy pattern"))
    .collect()
});

/// Reduce a filename to its duplicate-grouping key.
///
/// Splits off the extension, strips each copy-suffix pattern from the
/// stem once in order, and rejoins. With `case_sensitive` unset the
/// whole key is lowercased, so `Report.TXT` and `report (2).txt`
/// collide.
///
/// # Example
///
/// ```
/// use filescope::duplicates::normalize_filename;
///
/// assert_eq!(normalize_filename("report (1).txt", true), "report.txt");
/// assert_eq!(normalize_filename("report - Copy.txt", true), "report.txt");
/// assert_eq!(normalize_filename("photo_2.jpg", true), "photo.jpg");
/// ```
#[must_use]
pub fn normalize_filename(filename: &str, case_sensitive: bool) -> String {
    let (stem, ext) = split_name(filename);
    let mut stem = stem.to_string();
    for pattern in COPY_PATTERNS.iter() {
        if let Some(m) = pattern.find(&stem) {
            stem.truncate(m.start());
        }
    }
    let mut key = stem;
    key.push_str(ext);
    if case_sensitive {
        key
    } else {
        key.to_lowercase()
    }
}

/// Split a filename into stem and extension. The extension is the final
/// dot segment whose dot is preceded by a non-dot character, matching
/// the indexer's derivation.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && name[..idx].chars().any(|c| c != '.') => {
            (&name[..idx], &name[idx..])
        }
        _ => (name, ""),
    }
}

/// Fast-scan tuning knobs.
#[derive(Debug, Clone)]
pub struct FastScanConfig {
    /// Require matching sizes in addition to colliding names.
    pub match_size: bool,
    /// Keep name case significant. Defaults to the platform convention:
    /// insensitive on Windows, sensitive elsewhere.
    pub case_sensitive: bool,
    /// Files scanned between count events.
    pub progress_interval: usize,
}

impl Default for FastScanConfig {
    fn default() -> Self {
        Self {
            match_size: false,
            case_sensitive: !cfg!(windows),
            progress_interval: FAST_PROGRESS_INTERVAL,
        }
    }
}

/// Filename-collision duplicate scanner over a directory tree.
pub struct FastScanner {
    root: PathBuf,
    config: FastScanConfig,
    cancel: Option<CancelFlag>,
}

impl FastScanner {
    /// Create a scanner rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: FastScanConfig::default(),
            cancel: None,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: FastScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a cooperative cancel flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Scan the tree and return groups of two or more colliding files.
    ///
    /// Hidden directories are skipped; the indexer's OS deny-list is
    /// not applied. Unreadable paths are skipped.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidRoot`] when the root is not a directory,
    /// [`EngineError::Cancelled`] when the flag is raised mid-scan.
    pub fn run(&self, sink: &dyn EventSink) -> Result<Vec<DuplicateGroup>, EngineError> {
        if !self.root.is_dir() {
            return Err(EngineError::InvalidRoot(self.root.clone()));
        }
        sink.on_progress(&format!("Scanning {}...", self.root.display()));

        let mut walker = Walker::new(vec![self.root.clone()])
            .with_config(WalkerConfig::hidden_only());
        if let Some(ref flag) = self.cancel {
            walker = walker.with_cancel_flag(flag.clone());
        }

        let mut buckets: HashMap<(String, Option<u64>), Vec<DuplicateFile>> = HashMap::new();
        let mut scanned: u64 = 0;

        for result in walker.walk() {
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    log::trace!("skipping path: {err}");
                    continue;
                }
            };

            let normalized = normalize_filename(&record.name, self.config.case_sensitive);
            let size_key = self.config.match_size.then_some(record.size);
            buckets
                .entry((normalized, size_key))
                .or_default()
                .push(DuplicateFile::from_record(&record));

            scanned += 1;
            if scanned % self.config.progress_interval as u64 == 0 {
                sink.on_count(scanned);
            }
        }
        if walker.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        sink.on_count(scanned);

        let groups: Vec<DuplicateGroup> = buckets
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|((key, _), files)| DuplicateGroup::new(key, files))
            .collect();

        log::info!(
            "fast scan of {} found {} groups across {} files",
            self.root.display(),
            groups.len(),
            scanned
        );
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::signal::{cancel_flag, request_cancel};
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn strips_each_copy_suffix() {
        assert_eq!(normalize_filename("report (1).txt", true), "report.txt");
        assert_eq!(normalize_filename("report - Copy.txt", true), "report.txt");
        assert_eq!(normalize_filename("report Copy.txt", true), "report.txt");
        assert_eq!(normalize_filename("report_copy.txt", true), "report.txt");
        assert_eq!(normalize_filename("report - 2.txt", true), "report.txt");
        assert_eq!(normalize_filename("report_2.txt", true), "report.txt");
    }

    #[test]
    fn suffix_matching_is_case_insensitive() {
        assert_eq!(normalize_filename("report - COPY.txt", true), "report.txt");
        assert_eq!(normalize_filename("report_COPY.txt", true), "report.txt");
    }

    #[test]
    fn plain_digits_in_stem_are_stripped_only_as_suffix() {
        // "report2" has no separator before the digit; it is a distinct
        // name, not a copy of "report".
        assert_eq!(normalize_filename("report2.txt", true), "report2.txt");
        assert_eq!(normalize_filename("2024.txt", true), "2024.txt");
    }

    #[test]
    fn case_insensitive_mode_lowercases_the_key() {
        assert_eq!(
            normalize_filename("Report.TXT", false),
            "report.txt"
        );
        assert_eq!(normalize_filename("Report.TXT", true), "Report.TXT");
    }

    #[test]
    fn names_without_extension_normalize_whole() {
        assert_eq!(normalize_filename("Makefile", true), "Makefile");
        assert_eq!(normalize_filename("backup (3)", true), "backup");
        assert_eq!(normalize_filename(".bashrc", true), ".bashrc");
    }

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        write!(f, "{contents}").unwrap();
    }

    #[test]
    fn copies_group_together() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "report.txt", "data");
        write_file(dir.path(), "report (1).txt", "data");
        write_file(dir.path(), "report - Copy.txt", "data");
        write_file(dir.path(), "report_copy.txt", "data");
        write_file(dir.path(), "report2.txt", "other");

        let groups = FastScanner::new(dir.path().to_path_buf())
            .run(&NullSink)
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "report.txt");
        assert_eq!(groups[0].count(), 4);
        assert!(groups[0]
            .files
            .iter()
            .all(|f| f.name != "report2.txt"));
    }

    #[test]
    fn match_size_separates_different_sizes() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "photo.jpg", "tiny");
        write_file(dir.path(), "photo (1).jpg", "much longer contents");

        let config = FastScanConfig {
            match_size: true,
            ..Default::default()
        };
        let groups = FastScanner::new(dir.path().to_path_buf())
            .with_config(config)
            .run(&NullSink)
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn invalid_root_is_rejected() {
        let err = FastScanner::new(PathBuf::from("/no/such/dir"))
            .run(&NullSink)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRoot(_)));
    }

    #[test]
    fn cancelled_scan_reports_cancelled() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "x");
        let flag = cancel_flag();
        request_cancel(&flag);

        let err = FastScanner::new(dir.path().to_path_buf())
            .with_cancel_flag(flag)
            .run(&NullSink)
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}

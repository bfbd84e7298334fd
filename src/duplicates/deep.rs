//! Content-hash duplicate scanning.
//!
//! Two-phase pipeline: a size pass buckets every file by byte length,
//! then only files sharing a size with at least one other are hashed.
//! Hashing streams fixed-size chunks through the digest on a bounded
//! worker pool so memory stays flat regardless of file size.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::error::EngineError;
use crate::events::EventSink;
use crate::index::FileRecord;
use crate::signal::{is_cancelled, CancelFlag};
use crate::walker::{Walker, WalkerConfig};

use super::{DuplicateFile, DuplicateGroup};

/// Bytes read per hashing chunk.
pub const HASH_CHUNK_SIZE: usize = 8192;

/// Hashing worker threads; sized for disk I/O, not CPU.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Files sized between count events in phase one.
pub const SIZE_PROGRESS_INTERVAL: usize = 100;

/// Files hashed between progress messages in phase two.
pub const HASH_PROGRESS_INTERVAL: u64 = 10;

/// Content digest used by the deep scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3, the default: fastest by a wide margin.
    #[default]
    Blake3,
    /// SHA-256, for callers that need a standardized digest.
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Deep-scan tuning knobs.
#[derive(Debug, Clone)]
pub struct DeepScanConfig {
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Hashing worker threads.
    pub io_threads: usize,
    /// Phase-one files between count events.
    pub progress_interval: usize,
}

impl Default for DeepScanConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            io_threads: DEFAULT_IO_THREADS,
            progress_interval: SIZE_PROGRESS_INTERVAL,
        }
    }
}

/// Content-hash duplicate scanner over a directory tree.
pub struct DeepScanner {
    root: PathBuf,
    config: DeepScanConfig,
    cancel: Option<CancelFlag>,
}

impl DeepScanner {
    /// Create a scanner rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: DeepScanConfig::default(),
            cancel: None,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: DeepScanConfig) -> Self {
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

    /// Scan the tree and return groups of two or more content-identical
    /// files, keyed by hex digest.
    ///
    /// Zero-byte files are excluded outright. A file that cannot be
    /// read during hashing is dropped from consideration; it never
    /// fails the scan.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidRoot`] when the root is not a directory,
    /// [`EngineError::Cancelled`] when the flag is raised mid-scan.
    pub fn run(&self, sink: &dyn EventSink) -> Result<Vec<DuplicateGroup>, EngineError> {
        if !self.root.is_dir() {
            return Err(EngineError::InvalidRoot(self.root.clone()));
        }

        let candidates = self.size_pass(sink)?;
        if self.cancelled() {
            return Err(EngineError::Cancelled);
        }

        sink.on_progress(&format!(
            "Hashing {} potential duplicates...",
            candidates.len()
        ));
        let hashed = self.hash_candidates(&candidates, sink);
        if self.cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut buckets: HashMap<String, Vec<DuplicateFile>> = HashMap::new();
        for (digest, file) in hashed {
            buckets.entry(digest).or_default().push(file);
        }
        let groups: Vec<DuplicateGroup> = buckets
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(digest, files)| DuplicateGroup::new(digest, files))
            .collect();

        log::info!(
            "deep scan of {} found {} duplicate groups",
            self.root.display(),
            groups.len()
        );
        Ok(groups)
    }

    /// Phase one: bucket every non-empty file by size and keep only the
    /// buckets with at least two members.
    fn size_pass(&self, sink: &dyn EventSink) -> Result<Vec<FileRecord>, EngineError> {
        sink.on_progress(&format!("Scanning {} by size...", self.root.display()));

        let mut walker = Walker::new(vec![self.root.clone()])
            .with_config(WalkerConfig::hidden_only());
        if let Some(ref flag) = self.cancel {
            walker = walker.with_cancel_flag(flag.clone());
        }

        let mut by_size: HashMap<u64, Vec<FileRecord>> = HashMap::new();
        let mut scanned: u64 = 0;
        for result in walker.walk() {
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    log::trace!("skipping path: {err}");
                    continue;
                }
            };
            // Empty files are trivially identical and never reported.
            if record.size == 0 {
                continue;
            }
            by_size.entry(record.size).or_default().push(record);

            scanned += 1;
            if scanned % self.config.progress_interval as u64 == 0 {
                sink.on_count(scanned);
            }
        }
        sink.on_count(scanned);

        Ok(by_size
            .into_values()
            .filter(|files| files.len() > 1)
            .flatten()
            .collect())
    }

    /// Phase two: hash the candidates on a bounded pool.
    fn hash_candidates(
        &self,
        candidates: &[FileRecord],
        sink: &dyn EventSink,
    ) -> Vec<(String, DuplicateFile)> {
        let algorithm = self.config.algorithm;
        let total = candidates.len() as u64;
        let done = AtomicU64::new(0);

        let hash_one = |record: &FileRecord| -> Option<(String, DuplicateFile)> {
            if self.cancelled() {
                return None;
            }
            let result = hash_file(&record.path, algorithm);

            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            if finished % HASH_PROGRESS_INTERVAL == 0 {
                sink.on_progress(&format!("Hashed {finished}/{total} files"));
            }

            match result {
                Ok(digest) => {
                    let mut file = DuplicateFile::from_record(record);
                    file.hash = Some(digest.clone());
                    Some((digest, file))
                }
                Err(err) => {
                    log::warn!("failed to hash {}: {}", record.path.display(), err);
                    None
                }
            }
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
        {
            Ok(pool) => pool.install(|| {
                candidates.par_iter().filter_map(hash_one).collect()
            }),
            Err(err) => {
                log::warn!("falling back to the global pool: {err}");
                candidates.par_iter().filter_map(hash_one).collect()
            }
        }
    }
}

/// Stream a file through the digest in fixed-size chunks.
///
/// # Errors
///
/// Any I/O error opening or reading the file.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; HASH_CHUNK_SIZE];
    match algorithm {
        HashAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize().to_hex().to_string())
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(to_hex(&hasher.finalize()))
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::signal::{cancel_flag, request_cancel};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path
    }

    #[test]
    fn identical_content_groups_under_one_digest() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.bin", b"same bytes");
        write_file(dir.path(), "b.bin", b"same bytes");
        write_file(dir.path(), "c.bin", b"different!");

        let groups = DeepScanner::new(dir.path().to_path_buf())
            .run(&NullSink)
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count(), 2);
        for f in &groups[0].files {
            assert_eq!(f.hash.as_deref(), Some(groups[0].key.as_str()));
        }
    }

    #[test]
    fn same_size_different_content_not_grouped() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.bin", b"aaaaaaaa");
        write_file(dir.path(), "b.bin", b"bbbbbbbb");

        let groups = DeepScanner::new(dir.path().to_path_buf())
            .run(&NullSink)
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn zero_byte_files_are_excluded() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "empty1", b"");
        write_file(dir.path(), "empty2", b"");

        let groups = DeepScanner::new(dir.path().to_path_buf())
            .run(&NullSink)
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn sha256_digest_matches_known_vector() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "abc.txt", b"abc");
        let digest = hash_file(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn blake3_digest_is_stable_across_chunk_boundaries() {
        let dir = TempDir::new().unwrap();
        // Larger than one chunk so the streaming path is exercised.
        let big = vec![0x5au8; HASH_CHUNK_SIZE * 3 + 17];
        let a = write_file(dir.path(), "a.bin", &big);
        let b = write_file(dir.path(), "b.bin", &big);
        assert_eq!(
            hash_file(&a, HashAlgorithm::Blake3).unwrap(),
            hash_file(&b, HashAlgorithm::Blake3).unwrap()
        );
    }

    #[test]
    fn invalid_root_is_rejected() {
        let err = DeepScanner::new(PathBuf::from("/no/such/dir"))
            .run(&NullSink)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRoot(_)));
    }

    #[test]
    fn cancelled_scan_reports_cancelled() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.bin", b"x");
        let flag = cancel_flag();
        request_cancel(&flag);

        let err = DeepScanner::new(dir.path().to_path_buf())
            .with_cancel_flag(flag)
            .run(&NullSink)
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}

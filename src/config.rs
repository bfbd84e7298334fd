//! Engine configuration.
//!
//! Configuration comes from an optional TOML file layered over built-in
//! defaults. Every field has a default, so an absent or empty file is
//! valid; an explicitly named file that cannot be read or parsed is an
//! error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::duplicates::HashAlgorithm;
use crate::index::indexer::{CACHE_THRESHOLD, INDEX_BATCH_SIZE};
use crate::index::search::SEARCH_BATCH_SIZE;
use crate::index::IndexerConfig;
use crate::walker::{WalkerConfig, DEFAULT_EXCLUDED_DIRS};

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// The file that failed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Engine-wide settings, deserialized from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Metadata database path. `None` resolves to the platform data
    /// directory.
    pub db_path: Option<PathBuf>,
    /// Directory names the indexer never descends into.
    pub excluded_dirs: Vec<String>,
    /// Skip hidden directories during traversal.
    pub skip_hidden: bool,
    /// Minimum cached entries for an incremental scan.
    pub cache_threshold: usize,
    /// Full-scan persistence batch size.
    pub batch_size: usize,
    /// Modification-time delta (seconds) treated as unchanged.
    pub mtime_tolerance_secs: f64,
    /// Search results per batch event.
    pub search_batch_size: usize,
    /// Deep-scan hashing threads.
    pub io_threads: usize,
    /// Deep-scan digest algorithm.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            excluded_dirs: DEFAULT_EXCLUDED_DIRS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            skip_hidden: true,
            cache_threshold: CACHE_THRESHOLD,
            batch_size: INDEX_BATCH_SIZE,
            mtime_tolerance_secs: 1.0,
            search_batch_size: SEARCH_BATCH_SIZE,
            io_threads: crate::duplicates::deep::DEFAULT_IO_THREADS,
            hash_algorithm: HashAlgorithm::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist and parse. Without
    /// one, the platform config directory is consulted and silently
    /// skipped when absent.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when a named or discovered file cannot be read
    /// or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config =
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        Ok(config)
    }

    /// The platform config file location, e.g.
    /// `~/.config/filescope/config.toml` on Linux.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "filescope")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolve the database path, falling back to the platform data
    /// directory.
    #[must_use]
    pub fn resolve_db_path(&self) -> PathBuf {
        if let Some(ref path) = self.db_path {
            return path.clone();
        }
        ProjectDirs::from("", "", "filescope")
            .map(|dirs| dirs.data_dir().join("filescope.db"))
            .unwrap_or_else(|| PathBuf::from("filescope.db"))
    }

    /// Traversal filtering derived from these settings.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            skip_hidden: self.skip_hidden,
            excluded_dirs: self.excluded_dirs.clone(),
        }
    }

    /// Indexer settings derived from these settings.
    #[must_use]
    pub fn indexer_config(&self, force_full: bool, roots: Option<Vec<PathBuf>>) -> IndexerConfig {
        IndexerConfig {
            force_full,
            cache_threshold: self.cache_threshold,
            batch_size: self.batch_size,
            mtime_tolerance: self.mtime_tolerance_secs,
            walker: self.walker_config(),
            roots,
            ..IndexerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_engine_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_threshold, 1000);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.search_batch_size, 100);
        assert_eq!(config.io_threads, 4);
        assert!((config.mtime_tolerance_secs - 1.0).abs() < f64::EPSILON);
        assert!(config.excluded_dirs.contains(&"node_modules".to_string()));
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            "cache_threshold = 50\nhash_algorithm = \"sha256\"\nexcluded_dirs = [\"target\"]\n"
        )
        .unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.cache_threshold, 50);
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.excluded_dirs, vec!["target".to_string()]);
        // Untouched fields keep their defaults.
        assert_eq!(config.batch_size, 500);
    }

    #[test]
    fn missing_named_file_is_an_error() {
        let err = EngineConfig::load(Some(Path::new("/no/such/config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cache_threshold = \"not a number\"").unwrap();

        let err = EngineConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_db_path_wins() {
        let config = EngineConfig {
            db_path: Some(PathBuf::from("/tmp/custom.db")),
            ..Default::default()
        };
        assert_eq!(config.resolve_db_path(), PathBuf::from("/tmp/custom.db"));
    }
}

//! Engine error taxonomy.
//!
//! Two tiers of failure exist in the engine:
//!
//! - [`WalkError`]: a problem with a single path (stat failure, vanished
//!   file, permission denied). These are always recovered locally by
//!   skipping the path and never terminate a scan.
//! - [`EngineError`]: a scan-level failure. Store I/O errors and invalid
//!   caller input terminate the current task; [`EngineError::Cancelled`]
//!   is the normal terminal state of a task whose cooperative cancel flag
//!   was raised, not a fault.

use std::path::PathBuf;

/// A per-path error encountered during traversal.
///
/// Consumers skip these and continue; they never escalate to scan level.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// Permission was denied when accessing a file or directory.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path vanished between enumeration and stat.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// Any other I/O error on a single path.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl WalkError {
    /// Classify a raw I/O error for one path.
    #[must_use]
    pub fn from_io(path: PathBuf, error: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match error.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::Io {
                path,
                source: error,
            },
        }
    }
}

/// A scan-level failure that terminates the current task.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The metadata store failed. Always scan-fatal.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The task observed its cancel flag and stopped cooperatively.
    ///
    /// Not a fault: partially persisted batches remain valid and the next
    /// incremental pass restores consistency.
    #[error("scan cancelled")]
    Cancelled,

    /// The caller supplied a root path that does not exist or is not a
    /// directory. Rejected before any task starts.
    #[error("invalid root path: {0}")]
    InvalidRoot(PathBuf),

    /// The caller supplied an empty deletion selection.
    #[error("empty selection: nothing to delete")]
    EmptySelection,

    /// An I/O error outside the skip-and-continue walker path.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Whether this terminal state is a cooperative cancellation rather
    /// than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_error_classifies_io_kinds() {
        let err = WalkError::from_io(
            PathBuf::from("/secret"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, WalkError::PermissionDenied(_)));

        let err = WalkError::from_io(
            PathBuf::from("/gone"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, WalkError::NotFound(_)));

        let err = WalkError::from_io(PathBuf::from("/odd"), std::io::Error::other("weird"));
        assert!(matches!(err, WalkError::Io { .. }));
    }

    #[test]
    fn cancelled_is_not_a_failure() {
        assert!(EngineError::Cancelled.is_cancelled());
        assert!(!EngineError::EmptySelection.is_cancelled());
    }

    #[test]
    fn error_display() {
        let err = EngineError::InvalidRoot(PathBuf::from("/nope"));
        assert_eq!(err.to_string(), "invalid root path: /nope");

        let err = WalkError::NotFound(PathBuf::from("/gone"));
        assert_eq!(err.to_string(), "path not found: /gone");
    }
}

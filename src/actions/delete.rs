//! Deletion of caller-selected duplicate files.
//!
//! The executor deletes exactly the files it was handed; selection
//! policy (which member of a group to keep) belongs to the caller. A
//! failure on one file never aborts the batch.

use std::fs;

use crate::error::EngineError;
use crate::events::EventSink;
use crate::signal::{is_cancelled, CancelFlag};

use crate::duplicates::DuplicateFile;

/// Terminal tally of a deletion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Files successfully removed.
    pub deleted: usize,
    /// Files that could not be removed: vanished since selection, not
    /// writable, or the unlink itself failed.
    pub failed: usize,
}

/// Deletes an explicit selection of files, one attempt per file.
pub struct DeletionExecutor {
    files: Vec<DuplicateFile>,
    cancel: Option<CancelFlag>,
}

impl DeletionExecutor {
    /// Create an executor over the caller's selection.
    #[must_use]
    pub fn new(files: Vec<DuplicateFile>) -> Self {
        Self {
            files,
            cancel: None,
        }
    }

    /// Attach a cooperative cancel flag checked before each attempt.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Attempt every deletion and report the tally.
    ///
    /// Emits one step event per attempt, success or failure. A file
    /// that disappeared between selection and execution counts as
    /// failed.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptySelection`] when handed no files,
    /// [`EngineError::Cancelled`] when the flag is raised mid-batch;
    /// attempts already made stay made.
    pub fn run(&self, sink: &dyn EventSink) -> Result<DeletionReport, EngineError> {
        if self.files.is_empty() {
            return Err(EngineError::EmptySelection);
        }

        let total = self.files.len() as u64;
        let mut report = DeletionReport::default();

        for (i, file) in self.files.iter().enumerate() {
            if self.cancel.as_ref().is_some_and(is_cancelled) {
                return Err(EngineError::Cancelled);
            }

            match delete_one(file) {
                Ok(()) => {
                    log::debug!("deleted {}", file.path.display());
                    report.deleted += 1;
                }
                Err(err) => {
                    log::warn!("failed to delete {}: {}", file.path.display(), err);
                    report.failed += 1;
                }
            }
            sink.on_step(i as u64 + 1, total);
        }

        log::info!(
            "deletion finished: {} deleted, {} failed",
            report.deleted,
            report.failed
        );
        Ok(report)
    }
}

fn delete_one(file: &DuplicateFile) -> std::io::Result<()> {
    let meta = fs::metadata(&file.path)?;
    if meta.permissions().readonly() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "file is read-only",
        ));
    }
    fs::remove_file(&file.path)
}

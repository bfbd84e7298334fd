//! Batched substring search over a published snapshot.
//!
//! Search runs against an immutable [`IndexSnapshot`] and never touches
//! the store. Matches stream to the sink in bounded batches; the summary
//! total is recomputed independently of batching so the two can never
//! drift apart.

use crate::error::EngineError;
use crate::events::EventSink;
use crate::index::{FileRecord, IndexSnapshot};
use crate::signal::{is_cancelled, CancelFlag};

/// Matches delivered per batch event.
pub const SEARCH_BATCH_SIZE: usize = 100;

/// A filename search request.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against the file name.
    pub query: String,
    /// Optional case-insensitive substring matched against the full
    /// path. Empty means no folder restriction.
    pub folder: String,
    /// Matches per delivered batch.
    pub batch_size: usize,
}

impl SearchQuery {
    /// A name query with no folder restriction.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            folder: String::new(),
            batch_size: SEARCH_BATCH_SIZE,
        }
    }

    /// Restrict matches to paths containing `folder`.
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }
}

/// The search predicate, over pre-lowercased needles.
fn matches(record: &FileRecord, needle: &str, folder: &str) -> bool {
    if !record.name.to_lowercase().contains(needle) {
        return false;
    }
    folder.is_empty()
        || record
            .path
            .to_string_lossy()
            .to_lowercase()
            .contains(folder)
}

/// Terminal result of a completed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    /// Number of records satisfying the predicate, recomputed over the
    /// snapshot rather than summed over batches.
    pub total: usize,
}

/// Search `snapshot` for records matching `query`, streaming results to
/// `sink` in bounded batches.
///
/// An empty query matches every record. A trailing partial batch is
/// flushed on completion; on cancellation the in-progress batch is
/// discarded whole and no summary is produced.
///
/// # Errors
///
/// [`EngineError::Cancelled`] when the flag is raised mid-search.
pub fn search_snapshot(
    snapshot: &IndexSnapshot,
    query: &SearchQuery,
    sink: &dyn EventSink,
    cancel: Option<&CancelFlag>,
) -> Result<SearchSummary, EngineError> {
    let batch_size = query.batch_size.max(1);
    let needle = query.query.to_lowercase();
    let folder = query.folder.to_lowercase();

    let mut batch: Vec<FileRecord> = Vec::with_capacity(batch_size);
    for record in snapshot.records() {
        if cancel.is_some_and(|flag| is_cancelled(flag)) {
            return Err(EngineError::Cancelled);
        }
        if matches(record, &needle, &folder) {
            batch.push(record.clone());
            if batch.len() == batch_size {
                sink.on_batch(&batch);
                batch.clear();
            }
        }
    }
    if !batch.is_empty() {
        sink.on_batch(&batch);
    }

    let total = snapshot
        .records()
        .iter()
        .filter(|r| matches(r, &needle, &folder))
        .count();
    log::debug!("search '{}' matched {} records", query.query, total);

    Ok(SearchSummary { total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::signal::{cancel_flag, request_cancel};
    use std::path::PathBuf;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), size, 1000.0, false)
    }

    fn snapshot() -> IndexSnapshot {
        IndexSnapshot::from_records(vec![
            record("/home/user/Report.txt", 10),
            record("/home/user/docs/report-final.pdf", 20),
            record("/var/log/syslog", 30),
            record("/home/user/photo.jpg", 40),
        ])
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let sink = MemorySink::new();
        let summary =
            search_snapshot(&snapshot(), &SearchQuery::new("REPORT"), &sink, None).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(sink.batched_records().len(), 2);
    }

    #[test]
    fn folder_filter_restricts_matches() {
        let sink = MemorySink::new();
        let query = SearchQuery::new("report").with_folder("docs");
        let summary = search_snapshot(&snapshot(), &query, &sink, None).unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(
            sink.batched_records()[0].name,
            "report-final.pdf".to_string()
        );
    }

    #[test]
    fn empty_query_matches_everything() {
        let sink = MemorySink::new();
        let summary =
            search_snapshot(&snapshot(), &SearchQuery::new(""), &sink, None).unwrap();
        assert_eq!(summary.total, 4);
    }

    #[test]
    fn matches_arrive_in_bounded_batches() {
        let records: Vec<_> = (0..25)
            .map(|i| record(&format!("/data/file{i}.txt"), i))
            .collect();
        let snap = IndexSnapshot::from_records(records);

        let sink = MemorySink::new();
        let mut query = SearchQuery::new("file");
        query.batch_size = 10;
        let summary = search_snapshot(&snap, &query, &sink, None).unwrap();

        assert_eq!(summary.total, 25);
        let batches = sink.batches.lock().unwrap();
        let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn total_equals_sum_of_batches() {
        let sink = MemorySink::new();
        let summary =
            search_snapshot(&snapshot(), &SearchQuery::new("o"), &sink, None).unwrap();
        assert_eq!(summary.total, sink.batched_records().len());
    }

    #[test]
    fn cancelled_search_emits_no_partial_batch() {
        let flag = cancel_flag();
        request_cancel(&flag);
        let sink = MemorySink::new();

        let err = search_snapshot(
            &snapshot(),
            &SearchQuery::new("report"),
            &sink,
            Some(&flag),
        )
        .unwrap_err();
        assert!(err.is_cancelled());
        assert!(sink.batches.lock().unwrap().is_empty());
    }
}

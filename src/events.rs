//! Engine-to-caller event surface.
//!
//! Every long-running task reports through an [`EventSink`]: free-form
//! progress messages, running counts, and bounded result batches. Events
//! are fire-and-forget and delivered in issuance order within one task;
//! no ordering is guaranteed between different task instances. Terminal
//! success and error states travel through the task's `Result`, not
//! through the sink.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::index::FileRecord;

/// Receiver for events emitted by a running task.
///
/// All methods have no-op defaults so implementors subscribe only to what
/// they need.
pub trait EventSink: Send + Sync {
    /// A human-readable progress message ("Indexing /home...").
    fn on_progress(&self, _message: &str) {}

    /// A running count of processed items.
    fn on_count(&self, _count: u64) {}

    /// A step within a known total, e.g. per-file deletion progress.
    fn on_step(&self, _current: u64, _total: u64) {}

    /// A bounded batch of records ready for consumption.
    ///
    /// Batches are never split: a batch is either delivered whole or, on
    /// cancellation, discarded whole.
    fn on_batch(&self, _records: &[FileRecord]) {}
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}

/// Sink that records every event in memory.
///
/// Used by embedders that want to poll results, and by the engine's own
/// tests to assert on event ordering and batch sizes.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Progress messages in issuance order.
    pub messages: Mutex<Vec<String>>,
    /// Count updates in issuance order.
    pub counts: Mutex<Vec<u64>>,
    /// Step updates in issuance order.
    pub steps: Mutex<Vec<(u64, u64)>>,
    /// Delivered batches, each kept whole.
    pub batches: Mutex<Vec<Vec<FileRecord>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All batched records flattened in delivery order.
    #[must_use]
    pub fn batched_records(&self) -> Vec<FileRecord> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|b| b.iter().cloned())
            .collect()
    }
}

impl EventSink for MemorySink {
    fn on_progress(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn on_count(&self, count: u64) {
        self.counts.lock().unwrap().push(count);
    }

    fn on_step(&self, current: u64, total: u64) {
        self.steps.lock().unwrap().push((current, total));
    }

    fn on_batch(&self, records: &[FileRecord]) {
        self.batches.lock().unwrap().push(records.to_vec());
    }
}

/// Terminal sink rendering a single indicatif spinner.
pub struct ConsoleSink {
    bar: Option<ProgressBar>,
}

impl ConsoleSink {
    /// Create a console sink. With `quiet` set, nothing is rendered.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        if quiet {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Finish and clear the spinner.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

impl EventSink for ConsoleSink {
    fn on_progress(&self, message: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(message.to_string());
        }
    }

    fn on_count(&self, count: u64) {
        if let Some(ref bar) = self.bar {
            bar.set_position(count);
        }
    }

    fn on_step(&self, current: u64, total: u64) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total);
            bar.set_position(current);
        }
    }
}

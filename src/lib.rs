//! # filescope
//!
//! Background file indexing and duplicate detection engine.
//!
//! The engine maintains a persistent metadata index over one or more
//! filesystem roots and offers four operations on top of it:
//!
//! - **Indexing** ([`index::Indexer`]): full or incremental scans that
//!   publish an immutable [`index::IndexSnapshot`] and persist metadata
//!   to a SQLite-backed [`store::MetadataStore`].
//! - **Search** ([`index::search_snapshot`]): batched, case-insensitive
//!   filename search over a published snapshot.
//! - **Duplicate scanning**: [`duplicates::FastScanner`] groups by
//!   normalized filename without reading contents;
//!   [`duplicates::DeepScanner`] groups by content hash within size
//!   buckets.
//! - **Deletion** ([`actions::DeletionExecutor`]): caller-selected
//!   files removed with a per-file success tally.
//!
//! Long-running operations run on worker threads behind
//! [`task::TaskHandle`], report through an [`events::EventSink`], and
//! honor cooperative cancellation via [`signal::CancelFlag`].
//!
//! # Example
//!
//! ```no_run
//! use filescope::events::NullSink;
//! use filescope::index::{Indexer, IndexerConfig};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), filescope::error::EngineError> {
//! let config = IndexerConfig {
//!     force_full: true,
//!     roots: Some(vec![PathBuf::from("/home")]),
//!     ..Default::default()
//! };
//! let outcome = Indexer::new(PathBuf::from("filescope.db"))
//!     .with_config(config)
//!     .run(&NullSink)?;
//! println!("indexed {} files", outcome.total());
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod events;
pub mod index;
pub mod logging;
pub mod signal;
pub mod store;
pub mod task;
pub mod walker;

pub use actions::{DeletionExecutor, DeletionReport};
pub use config::EngineConfig;
pub use duplicates::{DeepScanner, DuplicateFile, DuplicateGroup, FastScanner};
pub use error::{EngineError, WalkError};
pub use events::EventSink;
pub use index::{IndexSnapshot, Indexer};
pub use store::MetadataStore;
pub use task::TaskHandle;

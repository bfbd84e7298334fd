//! Persistent metadata store.
//!
//! The store is the only resource shared across tasks, and it is shared
//! by *path*, never by handle: each task opens its own exclusive
//! connection for its lifetime. Writes are additive insert-or-replace by
//! path key; concurrent indexer runs against one store are not supported
//! and must be serialized by the caller.

pub mod database;

pub use database::MetadataStore;

/// Cached per-path stat data used for incremental diffing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedMetadata {
    /// Size in bytes at last indexing.
    pub size: u64,
    /// Modification time (seconds since epoch) at last indexing.
    pub modified: f64,
}

/// Aggregate statistics over the persisted index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of indexed files.
    pub total_files: u64,
    /// Number of distinct extensions.
    pub total_extensions: u64,
    /// Sum of all file sizes in bytes.
    pub total_size: u64,
}

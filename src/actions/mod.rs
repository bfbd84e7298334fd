//! Caller-driven actions over scan results.

pub mod delete;

pub use delete::{DeletionExecutor, DeletionReport};

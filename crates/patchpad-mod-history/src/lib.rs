//! Bounded rollback history for applied patch batches.
//!
//! Provides an `UndoBuffer` that keeps full-document snapshots taken just
//! before each committed batch. The buffer is a bounded stack: once
//! full, the oldest snapshot is evicted to make room for the newest.

pub mod buffer;
pub mod config;
pub mod snapshot;

pub use buffer::UndoBuffer;
pub use config::HistoryConfig;
pub use snapshot::UndoSnapshot;

/// Snapshot type stored by the undo buffer.
use chrono::{DateTime, Utc};

/// Full document content captured immediately before a committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoSnapshot {
    /// The document text as it was before the batch applied.
    pub text: String,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl UndoSnapshot {
    pub fn new(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }
}

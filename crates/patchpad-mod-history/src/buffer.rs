/// Fixed-capacity stack of pre-commit document snapshots.
///
/// One snapshot is pushed per committed batch. Undo pops the newest one and
/// hands its text back to the caller, which commits it verbatim.
use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::config::HistoryConfig;
use crate::snapshot::UndoSnapshot;

/// Bounded history of whole-document snapshots.
pub struct UndoBuffer {
    /// Snapshots ordered oldest first.
    snapshots: VecDeque<UndoSnapshot>,
    /// Configuration parameters.
    config: HistoryConfig,
}

impl std::fmt::Debug for UndoBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoBuffer")
            .field("len", &self.snapshots.len())
            .field("capacity", &self.config.capacity)
            .finish()
    }
}

impl Default for UndoBuffer {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl UndoBuffer {
    /// Creates an empty buffer.
    pub fn new(config: HistoryConfig) -> Self {
        let config = HistoryConfig::with_capacity(config.capacity);
        Self {
            snapshots: VecDeque::with_capacity(config.capacity),
            config,
        }
    }

    /// Records the text that existed before a batch was applied.
    ///
    /// Evicts the oldest snapshot when the buffer is already full.
    pub fn push(&mut self, text: impl Into<String>, timestamp: DateTime<Utc>) {
        self.snapshots.push_back(UndoSnapshot::new(text, timestamp));
        while self.snapshots.len() > self.config.capacity {
            if let Some(evicted) = self.snapshots.pop_front() {
                tracing::debug!(
                    "Undo buffer full ({}), evicted snapshot from {}",
                    self.config.capacity,
                    evicted.timestamp
                );
            }
        }
    }

    /// Removes and returns the most recent snapshot.
    ///
    /// Returns `None` if there's nothing to undo.
    pub fn pop(&mut self) -> Option<UndoSnapshot> {
        self.snapshots.pop_back()
    }

    /// Returns the most recent snapshot without removing it.
    pub fn peek(&self) -> Option<&UndoSnapshot> {
        self.snapshots.back()
    }

    /// Whether undo is available.
    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    #[test]
    fn test_empty_buffer() {
        let mut buf = UndoBuffer::default();
        assert!(!buf.can_undo());
        assert!(buf.is_empty());
        assert!(buf.pop().is_none());
    }

    #[test]
    fn test_push_pop_lifo() {
        let mut buf = UndoBuffer::default();
        buf.push("first", at(1));
        buf.push("second", at(2));

        let snap = buf.pop().expect("pop");
        assert_eq!(snap.text, "second");
        assert_eq!(snap.timestamp, at(2));
        assert_eq!(buf.pop().expect("pop").text, "first");
        assert!(!buf.can_undo());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut buf = UndoBuffer::new(HistoryConfig::with_capacity(3));
        for i in 0..5 {
            buf.push(format!("v{i}"), at(i));
        }

        assert_eq!(buf.len(), 3);
        let mut texts = Vec::new();
        while let Some(snap) = buf.pop() {
            texts.push(snap.text);
        }
        assert_eq!(texts, vec!["v4", "v3", "v2"]);
    }

    #[test]
    fn test_never_exceeds_default_capacity() {
        let mut buf = UndoBuffer::default();
        for i in 0..120 {
            buf.push(format!("v{i}"), at(i));
            assert!(buf.len() <= 50);
        }
        assert_eq!(buf.len(), 50);
        assert_eq!(buf.peek().expect("peek").text, "v119");
    }

    #[test]
    fn test_zero_capacity_still_keeps_one() {
        let mut buf = UndoBuffer::new(HistoryConfig { capacity: 0 });
        buf.push("a", at(0));
        buf.push("b", at(1));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.peek().expect("peek").text, "b");
    }
}

//! Shared engine context.
//!
//! Everything a mutation path needs (the document, undo history, viewport
//! stabilizer, scroll host, clock and conflict verifier) lives in one
//! explicit object, passed by reference to the component doing the work.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use patchpad_config::EngineConfig;

use crate::clock::{Clock, Debouncer, SystemClock};
use crate::document::{CommitOrigin, DocumentState};
use crate::history::{HistoryConfig, UndoBuffer};
use crate::operation::EditOperation;
use crate::resolver::{AcceptAll, BatchResolver, Conflict, ConflictVerifier};
use crate::viewport::{DetachedViewport, ScrollHost, ViewportStabilizer};

/// Whether an apply changed the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Committed { version: u64 },
    /// The resolved text equals the current text; nothing was committed.
    NoOp,
}

/// Result of pushing a set of operations through the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcome: ApplyOutcome,
    /// Input positions of the operations that applied.
    pub applied: Vec<usize>,
    /// Operations skipped by the conflict checks. Non-fatal.
    pub conflicts: Vec<Conflict>,
}

impl ApplyReport {
    pub fn committed(&self) -> bool {
        matches!(self.outcome, ApplyOutcome::Committed { .. })
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    pub(crate) fn noop() -> Self {
        Self {
            outcome: ApplyOutcome::NoOp,
            applied: Vec::new(),
            conflicts: Vec::new(),
        }
    }
}

/// Result of an undo request. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Restored {
        version: u64,
        /// When the restored snapshot was taken.
        snapshot_at: DateTime<Utc>,
    },
    NothingToUndo,
}

/// State shared by all engine components.
pub struct EngineContext {
    pub document: DocumentState,
    pub undo: UndoBuffer,
    pub viewport: ViewportStabilizer,
    pub scroll: Box<dyn ScrollHost>,
    pub clock: Rc<dyn Clock>,
    pub verifier: Box<dyn ConflictVerifier>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("document", &self.document)
            .field("undo", &self.undo)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    /// Creates a context over `text` with a system clock, a detached
    /// viewport and no authoritative verifier.
    pub fn new(text: &str, config: &EngineConfig) -> Self {
        Self {
            document: DocumentState::new(text),
            undo: UndoBuffer::new(HistoryConfig::with_capacity(config.undo_capacity)),
            viewport: ViewportStabilizer::new(Debouncer::from_millis(config.viewport_settle_ms)),
            scroll: Box::new(DetachedViewport::default()),
            clock: Rc::new(SystemClock),
            verifier: Box::new(AcceptAll),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resolves `ops` against the live document and commits the result.
    ///
    /// The pre-commit text is pushed to the undo buffer first. A batch that
    /// resolves to the current text commits nothing and records no snapshot.
    pub fn apply_operations(&mut self, ops: &[EditOperation]) -> ApplyReport {
        if ops.is_empty() {
            return ApplyReport::noop();
        }

        let before = self.document.text();
        let resolution = BatchResolver::new(&*self.verifier).resolve(&before, ops);
        for conflict in &resolution.conflicts {
            tracing::warn!(
                "Skipped conflicting operation #{}: {:?}",
                conflict.index,
                conflict.reason
            );
        }

        if resolution.is_noop() {
            tracing::info!("Batch of {} operations is a no-op", ops.len());
            return ApplyReport {
                outcome: ApplyOutcome::NoOp,
                applied: resolution.applied,
                conflicts: resolution.conflicts,
            };
        }

        let now = self.now();
        self.capture_viewport();
        self.undo.push(before, now);
        let version = self.document.commit(resolution.text, CommitOrigin::Apply);
        self.restore_viewport();

        ApplyReport {
            outcome: ApplyOutcome::Committed { version },
            applied: resolution.applied,
            conflicts: resolution.conflicts,
        }
    }

    /// Commits the most recent undo snapshot verbatim.
    pub fn undo_last_apply(&mut self) -> UndoOutcome {
        let Some(snapshot) = self.undo.pop() else {
            tracing::info!("Nothing to undo");
            return UndoOutcome::NothingToUndo;
        };

        self.capture_viewport();
        let version = self.document.commit(snapshot.text, CommitOrigin::Undo);
        self.restore_viewport();

        UndoOutcome::Restored {
            version,
            snapshot_at: snapshot.timestamp,
        }
    }

    /// Opens a viewport bracket around a layout-affecting change.
    pub fn capture_viewport(&mut self) {
        let now = self.clock.now();
        self.viewport.capture(&*self.scroll, now);
    }

    /// Closes a viewport bracket opened by [`Self::capture_viewport`].
    pub fn restore_viewport(&mut self) {
        let now = self.clock.now();
        self.viewport.restore(&mut *self.scroll, now);
    }

    /// Drives deferred viewport restoration. Returns true while settling.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        self.viewport.tick(&mut *self.scroll, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hash::content_hash;

    fn context(text: &str) -> EngineContext {
        let mut ctx = EngineContext::new(text, &EngineConfig::default());
        ctx.clock = Rc::new(ManualClock::default());
        ctx
    }

    #[test]
    fn test_apply_commits_and_snapshots() {
        let mut ctx = context("Hello world");
        let report = ctx.apply_operations(&[EditOperation::replace(6, 11, "Codex")]);

        assert_eq!(report.outcome, ApplyOutcome::Committed { version: 1 });
        assert_eq!(ctx.document.text(), "Hello Codex");
        assert_eq!(ctx.undo.len(), 1);
        assert_eq!(ctx.undo.peek().expect("snapshot").text, "Hello world");
    }

    #[test]
    fn test_noop_pushes_no_snapshot() {
        let mut ctx = context("foo bar");
        let op = EditOperation::replace(0, 3, "baz").with_pre_hash(content_hash("xyz"));
        let report = ctx.apply_operations(&[op]);

        assert_eq!(report.outcome, ApplyOutcome::NoOp);
        assert_eq!(report.conflict_count(), 1);
        assert_eq!(ctx.document.version(), 0);
        assert!(ctx.undo.is_empty());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut ctx = context("x");
        assert!(!ctx.apply_operations(&[]).committed());
    }

    #[test]
    fn test_undo_restores_previous_text() {
        let mut ctx = context("one");
        ctx.apply_operations(&[EditOperation::replace(0, 3, "two")]);
        ctx.apply_operations(&[EditOperation::insert_after(3, "!")]);
        assert_eq!(ctx.document.text(), "two!");

        assert!(matches!(ctx.undo_last_apply(), UndoOutcome::Restored { version: 3, .. }));
        assert_eq!(ctx.document.text(), "two");
        assert!(matches!(ctx.undo_last_apply(), UndoOutcome::Restored { .. }));
        assert_eq!(ctx.document.text(), "one");
        assert_eq!(ctx.undo_last_apply(), UndoOutcome::NothingToUndo);
        assert_eq!(ctx.document.text(), "one");
    }

    #[test]
    fn test_undo_capacity_from_config() {
        let config = EngineConfig {
            undo_capacity: 2,
            ..EngineConfig::default()
        };
        let mut ctx = EngineContext::new("", &config);
        for i in 0..4 {
            ctx.apply_operations(&[EditOperation::insert_after(0, i.to_string())]);
        }
        assert_eq!(ctx.undo.len(), 2);
    }
}

//! Engine facade over the shared context and the diff overlay.
//!
//! This is the surface external collaborators talk to: proposal intake,
//! content pulls, accept/reject decisions, undo, and the commit and marker
//! subscriptions. Every call runs to completion before returning, so two
//! resolver passes can never interleave against the same document.

use std::rc::Rc;

use patchpad_config::EngineConfig;

use crate::clock::Clock;
use crate::context::{ApplyReport, EngineContext, UndoOutcome};
use crate::document::{CommitNotification, ContentResponse};
use crate::error::IntakeError;
use crate::operation::{EditOperation, ProposalBatch, RejectedOperation};
use crate::overlay::{
    AcceptAllOutcome, AcceptOutcome, DiffOverlay, MarkerEvent, OperationId, PendingDiff,
    RejectOutcome, SubscriptionId,
};
use crate::resolver::ConflictVerifier;
use crate::viewport::ScrollHost;

/// What happened to an incoming proposal batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeReport {
    /// Ids of the diffs staged for review. Empty in auto-commit mode.
    pub registered: Vec<OperationId>,
    /// Elements refused for their shape, by position in the message.
    pub rejected: Vec<RejectedOperation>,
    /// Set when the batch was applied straight away (auto-commit).
    pub applied: Option<ApplyReport>,
}

/// The patch-application engine for one open document.
#[derive(Debug)]
pub struct Engine {
    ctx: EngineContext,
    overlay: DiffOverlay,
    auto_commit: bool,
}

impl Engine {
    /// Creates an engine over `text` with a system clock, a detached
    /// viewport and no authoritative verifier.
    pub fn new(text: &str, config: &EngineConfig) -> Self {
        Self {
            ctx: EngineContext::new(text, config),
            overlay: DiffOverlay::new(config.wrap_navigation),
            auto_commit: config.auto_commit,
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.ctx.clock = clock;
        self
    }

    pub fn with_scroll_host<H: ScrollHost + 'static>(mut self, host: H) -> Self {
        self.ctx.scroll = Box::new(host);
        self
    }

    pub fn with_verifier<V: ConflictVerifier + 'static>(mut self, verifier: V) -> Self {
        self.ctx.verifier = Box::new(verifier);
        self
    }

    /// Parses and takes in a `{ "operations": [...] }` message.
    ///
    /// # Errors
    ///
    /// Returns an error only if the message itself is not valid JSON of
    /// that shape. Bad elements are reported in [`IntakeReport::rejected`].
    pub fn receive_proposal_json(&mut self, json: &str) -> Result<IntakeReport, IntakeError> {
        let batch = ProposalBatch::from_json(json)?;
        Ok(self.receive_proposal(&batch))
    }

    /// Takes in a proposal batch: validates each element, then stages the
    /// valid ones (or applies them at once in auto-commit mode).
    pub fn receive_proposal(&mut self, batch: &ProposalBatch) -> IntakeReport {
        let (operations, rejected) = batch.decode();
        let mut report = self.stage(operations);
        report.rejected = rejected;
        report
    }

    /// Takes in typed operations. Each one goes through the same shape check
    /// as wire input; refused ones are reported by position.
    pub fn receive_operations(&mut self, operations: Vec<EditOperation>) -> IntakeReport {
        let mut valid = Vec::with_capacity(operations.len());
        let mut rejected = Vec::new();
        for (index, op) in operations.into_iter().enumerate() {
            match op.validate() {
                Ok(()) => valid.push(op),
                Err(error) => {
                    tracing::warn!("Rejected operation #{index}: {error}");
                    rejected.push(RejectedOperation { index, error });
                }
            }
        }
        let mut report = self.stage(valid);
        report.rejected = rejected;
        report
    }

    fn stage(&mut self, operations: Vec<EditOperation>) -> IntakeReport {
        if operations.is_empty() {
            return IntakeReport::default();
        }

        if self.auto_commit {
            let applied = self.ctx.apply_operations(&operations);
            if applied.committed() {
                self.overlay.refresh_markers(&mut self.ctx);
            }
            return IntakeReport {
                applied: Some(applied),
                ..IntakeReport::default()
            };
        }

        IntakeReport {
            registered: self.overlay.register_batch(operations, &mut self.ctx),
            ..IntakeReport::default()
        }
    }

    /// Answers a content pull with the live document text.
    pub fn request_content(&self) -> ContentResponse {
        self.ctx.document.content()
    }

    pub fn text(&self) -> String {
        self.ctx.document.text()
    }

    pub fn version(&self) -> u64 {
        self.ctx.document.version()
    }

    pub fn accept_one(&mut self, id: OperationId) -> AcceptOutcome {
        self.overlay.accept_one(id, &mut self.ctx)
    }

    pub fn reject_one(&mut self, id: OperationId) -> RejectOutcome {
        self.overlay.reject_one(id, &mut self.ctx)
    }

    pub fn accept_all(&mut self) -> AcceptAllOutcome {
        self.overlay.accept_all(&mut self.ctx)
    }

    pub fn reject_all(&mut self) -> Vec<OperationId> {
        self.overlay.reject_all(&mut self.ctx)
    }

    /// Rolls the document back to before the most recent committed batch.
    ///
    /// Pending diffs stay pending; their markers are re-announced against
    /// the restored text.
    pub fn undo_last_apply(&mut self) -> UndoOutcome {
        let outcome = self.ctx.undo_last_apply();
        if matches!(outcome, UndoOutcome::Restored { .. }) {
            self.overlay.refresh_markers(&mut self.ctx);
        }
        outcome
    }

    pub fn can_undo(&self) -> bool {
        self.ctx.undo.can_undo()
    }

    pub fn undo_depth(&self) -> usize {
        self.ctx.undo.len()
    }

    pub fn find_next(&self, cursor: usize) -> Option<&PendingDiff> {
        self.overlay.find_next(cursor)
    }

    pub fn find_previous(&self, cursor: usize) -> Option<&PendingDiff> {
        self.overlay.find_previous(cursor)
    }

    /// Deferred work for the host's event loop. Returns true while the
    /// viewport is still being held.
    pub fn tick(&mut self) -> bool {
        self.ctx.tick()
    }

    pub fn subscribe_commits<F>(&mut self, callback: F)
    where
        F: FnMut(&CommitNotification) + 'static,
    {
        self.ctx.document.subscribe(callback);
    }

    pub fn subscribe_markers<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&MarkerEvent) + 'static,
    {
        self.overlay.subscribe(callback)
    }

    pub fn unsubscribe_markers(&mut self, id: SubscriptionId) -> bool {
        self.overlay.unsubscribe(id)
    }

    pub fn overlay(&self) -> &DiffOverlay {
        &self.overlay
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }
}

//! Diff overlay: staging, review and commit of proposed operations.
//!
//! Each incoming operation becomes a [`PendingDiff`] with a fresh
//! [`OperationId`]. A diff leaves the pending set exactly once, by accept or
//! by reject, and its id is never handed out again. Accepting goes through
//! the batch resolver and the document state holder in the
//! [`EngineContext`]; rejecting never touches the text. Every path that adds
//! or removes markers is bracketed by the viewport stabilizer.

mod markers;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{ApplyReport, EngineContext};
use crate::operation::EditOperation;

pub use markers::{MarkerBus, MarkerCallback, MarkerEvent, MarkerRange, SubscriptionId};

/// Identifier of a pending diff. Allocated monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// A proposed operation awaiting an accept/reject decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDiff {
    pub id: OperationId,
    pub operation: EditOperation,
    pub created_at: DateTime<Utc>,
}

impl PendingDiff {
    fn marker_range(&self, doc_len: usize) -> MarkerRange {
        let (start, end) = self.operation.clamped_range(doc_len);
        MarkerRange::new(start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted { id: OperationId, report: ApplyReport },
    NotFound(OperationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectOutcome {
    Rejected(OperationId),
    NotFound(OperationId),
}

/// Result of accepting every pending diff in one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptAllOutcome {
    /// Diffs accepted, in id order.
    pub ids: Vec<OperationId>,
    pub report: ApplyReport,
}

impl AcceptAllOutcome {
    /// Ids of the accepted diffs whose operations were skipped as conflicts.
    pub fn conflicted_ids(&self) -> Vec<OperationId> {
        self.report
            .conflicts
            .iter()
            .filter_map(|c| self.ids.get(c.index).copied())
            .collect()
    }
}

/// Owner of the pending-diff set.
#[derive(Debug)]
pub struct DiffOverlay {
    pending: BTreeMap<OperationId, PendingDiff>,
    next_id: u64,
    markers: MarkerBus,
    wrap_navigation: bool,
}

impl Default for DiffOverlay {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DiffOverlay {
    pub fn new(wrap_navigation: bool) -> Self {
        Self {
            pending: BTreeMap::new(),
            next_id: 0,
            markers: MarkerBus::new(),
            wrap_navigation,
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&MarkerEvent) + 'static,
    {
        self.markers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.markers.unsubscribe(id)
    }

    /// Stages each operation as a new pending diff and announces its marker.
    pub fn register_batch(
        &mut self,
        operations: Vec<EditOperation>,
        ctx: &mut EngineContext,
    ) -> Vec<OperationId> {
        let created_at = ctx.now();
        let doc_len = ctx.document.len_chars();
        let mut ids = Vec::with_capacity(operations.len());

        ctx.capture_viewport();
        for operation in operations {
            let id = OperationId(self.next_id);
            self.next_id += 1;
            let diff = PendingDiff {
                id,
                operation,
                created_at,
            };
            let range = diff.marker_range(doc_len);
            self.pending.insert(id, diff);
            self.markers.emit(&MarkerEvent::Added { id, range });
            ids.push(id);
        }
        ctx.restore_viewport();

        tracing::debug!("Registered {} pending diffs", ids.len());
        ids
    }

    /// Commits a single diff's operation. Sibling diffs stay pending.
    ///
    /// A diff whose operation conflicts is still removed; the conflict is in
    /// the returned report.
    pub fn accept_one(&mut self, id: OperationId, ctx: &mut EngineContext) -> AcceptOutcome {
        let Some(diff) = self.pending.remove(&id) else {
            tracing::debug!("Accept for unknown diff {id}");
            return AcceptOutcome::NotFound(id);
        };

        let report = ctx.apply_operations(std::slice::from_ref(&diff.operation));
        self.after_removal(&[id], report.committed(), ctx);

        tracing::info!("Accepted {id} ({} conflicts)", report.conflict_count());
        AcceptOutcome::Accepted { id, report }
    }

    /// Drops a diff and its marker. Never touches document text.
    pub fn reject_one(&mut self, id: OperationId, ctx: &mut EngineContext) -> RejectOutcome {
        if self.pending.remove(&id).is_none() {
            tracing::debug!("Reject for unknown diff {id}");
            return RejectOutcome::NotFound(id);
        }
        self.after_removal(&[id], false, ctx);
        tracing::info!("Rejected {id}");
        RejectOutcome::Rejected(id)
    }

    /// Commits every pending diff through one resolver pass, producing a
    /// single commit and a single undo snapshot.
    pub fn accept_all(&mut self, ctx: &mut EngineContext) -> AcceptAllOutcome {
        let drained = std::mem::take(&mut self.pending);
        let ids: Vec<OperationId> = drained.keys().copied().collect();
        let operations: Vec<EditOperation> =
            drained.into_values().map(|diff| diff.operation).collect();

        let report = ctx.apply_operations(&operations);
        self.after_removal(&ids, report.committed(), ctx);

        tracing::info!(
            "Accepted {} diffs ({} conflicts)",
            ids.len(),
            report.conflict_count()
        );
        AcceptAllOutcome { ids, report }
    }

    /// Drops every pending diff. Returns the ids removed.
    pub fn reject_all(&mut self, ctx: &mut EngineContext) -> Vec<OperationId> {
        let ids: Vec<OperationId> = std::mem::take(&mut self.pending).into_keys().collect();
        self.after_removal(&ids, false, ctx);
        tracing::info!("Rejected {} diffs", ids.len());
        ids
    }

    /// Re-announces every pending marker against the current document.
    pub fn refresh_markers(&mut self, ctx: &mut EngineContext) {
        if self.pending.is_empty() {
            return;
        }
        ctx.capture_viewport();
        self.emit_updates(ctx.document.len_chars());
        ctx.restore_viewport();
    }

    fn after_removal(&mut self, ids: &[OperationId], committed: bool, ctx: &mut EngineContext) {
        if ids.is_empty() {
            return;
        }
        ctx.capture_viewport();
        for &id in ids {
            self.markers.emit(&MarkerEvent::Removed { id });
        }
        if committed {
            self.emit_updates(ctx.document.len_chars());
        }
        ctx.restore_viewport();
    }

    // Ranges are clamped, never rebased: offsets stay as authored.
    fn emit_updates(&mut self, doc_len: usize) {
        for diff in self.pending.values() {
            self.markers.emit(&MarkerEvent::Updated {
                id: diff.id,
                range: diff.marker_range(doc_len),
            });
        }
    }

    /// Nearest pending diff starting after `cursor`.
    pub fn find_next(&self, cursor: usize) -> Option<&PendingDiff> {
        lowest_start(self.pending.values().filter(|d| d.operation.start > cursor)).or_else(|| {
            if self.wrap_navigation {
                lowest_start(self.pending.values())
            } else {
                None
            }
        })
    }

    /// Nearest pending diff starting before `cursor`.
    pub fn find_previous(&self, cursor: usize) -> Option<&PendingDiff> {
        highest_start(self.pending.values().filter(|d| d.operation.start < cursor)).or_else(|| {
            if self.wrap_navigation {
                highest_start(self.pending.values())
            } else {
                None
            }
        })
    }

    pub fn get(&self, id: OperationId) -> Option<&PendingDiff> {
        self.pending.get(&id)
    }

    pub fn contains(&self, id: OperationId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Pending diffs in id order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingDiff> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// Both helpers expect diffs in id order, so the lower id wins a tie.
fn lowest_start<'a>(diffs: impl Iterator<Item = &'a PendingDiff>) -> Option<&'a PendingDiff> {
    diffs.fold(None, |best: Option<&'a PendingDiff>, diff| match best {
        Some(b) if b.operation.start <= diff.operation.start => Some(b),
        _ => Some(diff),
    })
}

fn highest_start<'a>(diffs: impl Iterator<Item = &'a PendingDiff>) -> Option<&'a PendingDiff> {
    diffs.fold(None, |best: Option<&'a PendingDiff>, diff| match best {
        Some(b) if b.operation.start >= diff.operation.start => Some(b),
        _ => Some(diff),
    })
}

//! Patch-application engine for an open text document.
//!
//! Externally authored edit proposals are staged as pending diffs, reviewed
//! one by one or in bulk, resolved deterministically against the live text,
//! and committed with a bounded undo path. The scroll position is held
//! steady across every change.
//!
//! Leaves first:
//! - [`operation`]: the edit operation model and inbound wire shapes
//! - [`resolver`]: deterministic batch application with conflict checks
//! - [`viewport`]: scroll capture/restore around layout changes
//! - [`document`]: the single owner of the document text
//! - [`overlay`]: pending-diff staging, review, navigation and marker events
//! - [`engine`]: the facade external collaborators use

pub mod buffer;
pub mod clock;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod hash;
pub mod history;
pub mod operation;
pub mod overlay;
pub mod resolver;
pub mod viewport;

pub use clock::{Clock, Debouncer, ManualClock, SystemClock};
pub use context::{ApplyOutcome, ApplyReport, EngineContext, UndoOutcome};
pub use document::{CommitNotification, CommitOrigin, ContentResponse, DocumentState};
pub use engine::{Engine, IntakeReport};
pub use error::{IntakeError, OperationError};
pub use hash::content_hash;
pub use operation::{EditOperation, OpType, ProposalBatch, RawOperation, RejectedOperation};
pub use overlay::{
    AcceptAllOutcome, AcceptOutcome, DiffOverlay, MarkerEvent, MarkerRange, OperationId,
    PendingDiff, RejectOutcome, SubscriptionId,
};
pub use resolver::{BatchResolver, Conflict, ConflictReason, ConflictVerifier, Resolution};
pub use viewport::{DetachedViewport, ScrollHost, ViewportStabilizer, ViewportState};

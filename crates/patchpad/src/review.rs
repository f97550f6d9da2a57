//! Accept/reject decisions given on the command line.
//!
//! The chosen diffs are committed together through one resolver pass, so
//! `--accept 0 --accept 1` and `--accept-all` agree whenever they pick the
//! same diffs. Everything not chosen is rejected.

use std::collections::BTreeSet;

use patchpad_core::{AcceptAllOutcome, Engine, OperationId};

/// Which pending diffs to accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(BTreeSet<OperationId>),
}

impl Selection {
    pub fn from_flags(accept_all: bool, ids: &[u64]) -> Self {
        if accept_all {
            Self::All
        } else {
            Self::Only(ids.iter().copied().map(OperationId).collect())
        }
    }
}

/// What [`apply`] did with the pending diffs.
#[derive(Debug)]
pub struct Decisions {
    pub accepted: AcceptAllOutcome,
    pub rejected: Vec<OperationId>,
    /// Selected ids that were never pending.
    pub unknown: Vec<OperationId>,
}

/// Rejects every pending diff outside `selection`, then commits the rest
/// as a single batch.
pub fn apply(engine: &mut Engine, selection: &Selection) -> Decisions {
    let mut unknown = Vec::new();
    let mut rejected = Vec::new();

    if let Selection::Only(ids) = selection {
        unknown = ids
            .iter()
            .copied()
            .filter(|id| !engine.overlay().contains(*id))
            .collect();
        let others: Vec<OperationId> = engine
            .overlay()
            .pending()
            .map(|diff| diff.id)
            .filter(|id| !ids.contains(id))
            .collect();
        for id in others {
            engine.reject_one(id);
            rejected.push(id);
        }
    }

    let accepted = engine.accept_all();
    Decisions {
        accepted,
        rejected,
        unknown,
    }
}

//! Marker events for pending diffs.
//!
//! The overlay never draws anything. It emits `added`/`removed`/`updated`
//! events on a [`MarkerBus`], and whatever rendering backend is subscribed
//! decides how a marker looks.

use serde::{Deserialize, Serialize};

use super::OperationId;

/// A half-open char range (`start..end`) a marker is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRange {
    pub start: usize,
    pub end: usize,
}

impl MarkerRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A change to the set of visible diff markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MarkerEvent {
    Added { id: OperationId, range: MarkerRange },
    Removed { id: OperationId },
    /// The document changed under a still-pending diff; re-place its marker.
    ///
    /// `range` is the diff's own target clamped to the new length, not a
    /// rebased position. It is the slice an accept would act on, which may
    /// no longer hold the text the diff was authored against.
    Updated { id: OperationId, range: MarkerRange },
}

impl MarkerEvent {
    pub fn id(&self) -> OperationId {
        match self {
            Self::Added { id, .. } | Self::Removed { id } | Self::Updated { id, .. } => *id,
        }
    }
}

/// Handle returned by [`MarkerBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Marker callback function type
pub type MarkerCallback = Box<dyn FnMut(&MarkerEvent)>;

/// Fan-out of marker events to subscribed renderers.
#[derive(Default)]
pub struct MarkerBus {
    subscribers: Vec<(SubscriptionId, MarkerCallback)>,
    next_id: u64,
}

impl std::fmt::Debug for MarkerBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl MarkerBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&MarkerEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &MarkerEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }
}

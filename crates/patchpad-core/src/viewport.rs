//! Scroll-position stabilization around document and marker changes.
//!
//! Replacing text or adding/removing diff markers can make the rendering
//! layer re-layout and jump the scroll position, sometimes a few frames
//! later. The stabilizer captures the offset before such a change, puts it
//! back immediately afterwards, and keeps putting it back on every
//! [`ViewportStabilizer::tick`] until the layout has been quiet for the
//! settle window.

use chrono::{DateTime, Utc};

use crate::clock::Debouncer;

/// Read/write access to the rendering layer's scroll position.
pub trait ScrollHost {
    fn scroll_offset(&self) -> f32;
    fn set_scroll_offset(&mut self, offset: f32);
}

/// Scroll host for headless use, where nothing is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetachedViewport {
    pub offset: f32,
}

impl ScrollHost for DetachedViewport {
    fn scroll_offset(&self) -> f32 {
        self.offset
    }

    fn set_scroll_offset(&mut self, offset: f32) {
        self.offset = offset;
    }
}

/// Scroll state captured ahead of a mutation. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportState {
    pub scroll_offset: f32,
}

/// Keeps the scroll offset stable across layout-affecting changes.
#[derive(Debug, Clone)]
pub struct ViewportStabilizer {
    /// Offset to hold, from capture until the settle window closes.
    captured: Option<ViewportState>,
    settle: Debouncer,
}

impl ViewportStabilizer {
    pub fn new(settle: Debouncer) -> Self {
        Self {
            captured: None,
            settle,
        }
    }

    /// Records the current scroll offset.
    ///
    /// While a previous restore is still settling, the offset being held is
    /// kept: the host may already have drifted from it.
    pub fn capture(&mut self, host: &dyn ScrollHost, now: DateTime<Utc>) -> ViewportState {
        // Window closed without a tick to notice.
        if self.settle.poll(now) {
            self.captured = None;
        }
        if let Some(state) = self.captured {
            return state;
        }
        let state = ViewportState {
            scroll_offset: host.scroll_offset(),
        };
        self.captured = Some(state);
        state
    }

    /// Re-applies the captured offset and opens (or extends) the settle
    /// window. Returns the restored state, if one was captured.
    pub fn restore(
        &mut self,
        host: &mut dyn ScrollHost,
        now: DateTime<Utc>,
    ) -> Option<ViewportState> {
        let state = self.captured?;
        host.set_scroll_offset(state.scroll_offset);
        self.settle.trigger(now);
        Some(state)
    }

    /// Deferred re-application, called once per frame/event-loop turn.
    ///
    /// Returns true while the stabilizer is still holding an offset.
    pub fn tick(&mut self, host: &mut dyn ScrollHost, now: DateTime<Utc>) -> bool {
        let Some(state) = self.captured else {
            return false;
        };
        if !self.settle.is_pending() {
            // Captured but not yet restored; nothing to enforce.
            return true;
        }
        if (host.scroll_offset() - state.scroll_offset).abs() > f32::EPSILON {
            tracing::debug!(
                "Viewport drifted to {}, restoring {}",
                host.scroll_offset(),
                state.scroll_offset
            );
        }
        host.set_scroll_offset(state.scroll_offset);
        if self.settle.poll(now) {
            self.captured = None;
            return false;
        }
        true
    }

    /// Whether a restored offset is still being held.
    pub fn is_settling(&self) -> bool {
        self.captured.is_some() && self.settle.is_pending()
    }
}

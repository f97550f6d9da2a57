//! Document state holder: the single owner of the live text.
//!
//! [`DocumentState::commit`] is the only way the text changes. It does not
//! resolve operations itself; callers decide whether a commit carries a
//! resolved batch or a raw undo restore, and say so via [`CommitOrigin`].

use serde::{Deserialize, Serialize};

use crate::buffer::TextBuffer;

/// What produced a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitOrigin {
    /// Result of resolving accepted operations.
    Apply,
    /// Snapshot restored by undo.
    Undo,
}

/// Emitted to the rendering layer after every commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNotification {
    pub new_text: String,
    pub version: u64,
    pub origin: CommitOrigin,
}

/// Response to a content pull from a preview collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub content: String,
}

/// Commit callback function type
pub type CommitCallback = Box<dyn FnMut(&CommitNotification)>;

/// The authoritative document text plus its commit observers.
pub struct DocumentState {
    buffer: TextBuffer,
    /// Monotonically increasing, bumped on every commit.
    content_version: u64,
    callbacks: Vec<CommitCallback>,
}

impl std::fmt::Debug for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentState")
            .field("len_chars", &self.buffer.len_chars())
            .field("content_version", &self.content_version)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new("")
    }
}

impl DocumentState {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: TextBuffer::from(text),
            content_version: 0,
            callbacks: Vec::new(),
        }
    }

    /// Returns the current full text.
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    /// Returns the clamped char range `[start..end)` of the current text.
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.buffer.slice(start, end)
    }

    pub fn version(&self) -> u64 {
        self.content_version
    }

    /// Answers a content pull without touching the document.
    pub fn content(&self) -> ContentResponse {
        ContentResponse {
            content: self.text(),
        }
    }

    /// Registers a rendering-layer observer for commits.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&CommitNotification) + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Replaces the whole text and notifies observers.
    ///
    /// Returns the new content version.
    pub fn commit(&mut self, new_text: String, origin: CommitOrigin) -> u64 {
        self.buffer = TextBuffer::from(new_text.as_str());
        self.content_version = self.content_version.wrapping_add(1);
        tracing::info!(
            "Committed {origin:?} v{} ({} chars)",
            self.content_version,
            self.buffer.len_chars()
        );

        let notification = CommitNotification {
            new_text,
            version: self.content_version,
            origin,
        };
        for callback in &mut self.callbacks {
            callback(&notification);
        }
        self.content_version
    }
}

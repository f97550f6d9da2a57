//! Text buffer wrapping `ropey::Rope` for splicing by char offset.
//!
//! Every offset-taking method clamps into `[0, len_chars]` instead of
//! failing, since proposals may target a stale view of the document.

use std::fmt;

use ropey::Rope;

/// A text buffer backed by a rope data structure for efficient editing.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    rope: Rope,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rope)
    }
}

impl TextBuffer {
    /// Creates an empty text buffer.
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Returns the total number of characters in the buffer.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Clamps `start..end` into the buffer, keeping `start <= end`.
    pub fn clamp_range(&self, start: usize, end: usize) -> (usize, usize) {
        let len = self.rope.len_chars();
        let start = start.min(len);
        (start, end.clamp(start, len))
    }

    /// Returns the text in the clamped char range `[start..end)`.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let (start, end) = self.clamp_range(start, end);
        self.rope.slice(start..end).to_string()
    }

    /// Replaces the clamped char range `[start..end)` with `text`.
    ///
    /// Returns the range actually replaced.
    pub fn splice(&mut self, start: usize, end: usize, text: &str) -> (usize, usize) {
        let (start, end) = self.clamp_range(start, end);
        if start < end {
            self.rope.remove(start..end);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
        }
        (start, end)
    }
}

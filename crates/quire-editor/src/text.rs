//! Text buffer abstraction for the canonical content value.
//!
//! The canonical value is edited by splicing fragments at character offsets
//! reported by the raw input surface, so it lives in a rope rather than a
//! `String`. All offsets are in Unicode scalar values (chars), not bytes.

use std::ops::Range;

/// A text buffer that supports char-offset editing.
pub trait TextBuffer {
    /// Total length in chars (Unicode scalar values).
    fn len_chars(&self) -> usize;

    /// Check if empty.
    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert text at char offset.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete char range.
    fn delete(&mut self, char_range: Range<usize>);

    /// Replace char range with text.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    /// Replace the whole buffer.
    fn set(&mut self, text: &str) {
        self.replace(0..self.len_chars(), text);
    }

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;

    /// Compare contents without allocating where the backend allows it.
    fn eq_str(&self, other: &str) -> bool {
        self.to_string() == other
    }
}

/// Ropey-backed buffer holding an editor's canonical value.
#[derive(Clone, Debug, Default)]
pub struct ContentRope {
    rope: ropey::Rope,
}

impl ContentRope {
    /// Create a new empty rope.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextBuffer for ContentRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn set(&mut self, text: &str) {
        self.rope = ropey::Rope::from_str(text);
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn eq_str(&self, other: &str) -> bool {
        self.rope == other
    }
}

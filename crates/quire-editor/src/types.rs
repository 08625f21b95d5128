//! Core editor types: mode, selection, composition and field identity.

use std::fmt;
use std::ops::Range;

use smol_str::SmolStr;

/// Which surface the author is currently editing through.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    /// Plain text input showing the literal content string.
    Raw,
    /// Editable rendered surface.
    #[default]
    Preview,
}

/// Text selection with anchor and head positions, in chars.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where cursor is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Convert to a Range<usize> (ordered).
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Clamp both ends to `len`.
    pub fn clamped(self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            head: self.head.min(len),
        }
    }
}

/// An in-progress input method composition.
///
/// While one exists, surface input events are counted but never written to
/// the canonical value; composition end flushes the surface once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositionState {
    /// Surface input events seen since composition started.
    pub deferred_inputs: usize,
}

/// Stable identity of one answer field on an authoring screen.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    /// Template step the field belongs to.
    pub step: u32,
    /// Field name within the step.
    pub field: SmolStr,
}

impl FieldKey {
    pub fn new(step: u32, field: impl Into<SmolStr>) -> Self {
        Self {
            step,
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}/{}", self.step, self.field)
    }
}

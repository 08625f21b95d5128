//! Editable surface abstraction.
//!
//! The preview mode edits through a rendered, editable surface: a browser
//! `contenteditable`, a native rich-text control, or a headless document for
//! tests. This trait is the seam between the editor session and whatever
//! hosts that surface. Composition, focus and blur are reported to the
//! session by the host; the session only reads and writes through here.

use miette::Diagnostic;
use quire_content::{ParsedSegment, parse};
use thiserror::Error;

/// A surface refused an operation; the session falls back where it can.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{0}")]
#[diagnostic(code(quire::surface))]
pub struct SurfaceError(pub String);

impl SurfaceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A rendered surface the author can edit directly.
pub trait EditableSurface {
    /// Current markup shown by the surface, placeholder included if shown.
    fn live_content(&self) -> String;

    /// Replace everything the surface shows.
    fn set_live_content(&mut self, markup: &str);

    /// Insert a fragment at the surface's caret or over its selection.
    ///
    /// Fails when the surface has no caret or its native insertion refuses
    /// the fragment; the caller then falls back to appending.
    fn insert_at_caret(&mut self, fragment: &str) -> Result<(), SurfaceError>;

    /// Whether the surface is currently showing placeholder text.
    fn shows_placeholder(&self) -> bool;

    /// Show placeholder text in place of any content.
    fn show_placeholder(&mut self, placeholder: &str);

    /// Remove placeholder text, leaving the surface empty.
    fn clear_placeholder(&mut self);

    /// No visible text and no embedded table or image.
    fn is_blank(&self) -> bool {
        parse(&self.live_content()).all(|segment| match segment {
            ParsedSegment::Text(text) => visible_text(&text).trim().is_empty(),
            ParsedSegment::Table(_) | ParsedSegment::Image(_) => false,
        })
    }
}

/// Text with any tags (e.g. a stray `<br>` left by an emptied surface) removed.
fn visible_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// In-memory surface with a simulated caret.
///
/// Stands in for a real document when the engine runs without a UI. The
/// caret is a byte offset into the markup; `None` means the surface has no
/// selection, which makes [`EditableSurface::insert_at_caret`] fail.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    markup: String,
    caret: Option<usize>,
    placeholder_shown: bool,
    refuse_insertion: bool,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the caret at a byte offset, clamped to a char boundary at or before it.
    pub fn set_caret(&mut self, offset: Option<usize>) {
        self.caret = offset.map(|offset| {
            let mut offset = offset.min(self.markup.len());
            while !self.markup.is_char_boundary(offset) {
                offset -= 1;
            }
            offset
        });
    }

    pub fn caret(&self) -> Option<usize> {
        self.caret
    }

    /// Make the native insertion primitive fail, as some hosts do.
    pub fn refuse_insertion(&mut self, refuse: bool) {
        self.refuse_insertion = refuse;
    }

    /// Type text at the caret (or the end when there is none), like a keystroke would.
    pub fn type_text(&mut self, text: &str) {
        let at = self.caret.unwrap_or(self.markup.len());
        self.markup.insert_str(at, text);
        self.caret = Some(at + text.len());
    }

    /// Replace the last `count` chars before the caret, as a composition update does.
    pub fn replace_before_caret(&mut self, count: usize, text: &str) {
        let end = self.caret.unwrap_or(self.markup.len());
        let start = if count == 0 {
            end
        } else {
            self.markup[..end]
                .char_indices()
                .rev()
                .nth(count - 1)
                .map_or(0, |(index, _)| index)
        };
        self.markup.replace_range(start..end, text);
        self.caret = Some(start + text.len());
    }
}

impl EditableSurface for HeadlessSurface {
    fn live_content(&self) -> String {
        self.markup.clone()
    }

    fn set_live_content(&mut self, markup: &str) {
        self.markup = markup.to_owned();
        self.placeholder_shown = false;
        self.caret = Some(self.markup.len());
    }

    fn insert_at_caret(&mut self, fragment: &str) -> Result<(), SurfaceError> {
        if self.refuse_insertion {
            return Err(SurfaceError::new("native insertion refused"));
        }
        let Some(at) = self.caret else {
            return Err(SurfaceError::new("surface has no caret"));
        };
        self.markup.insert_str(at, fragment);
        self.caret = Some(at + fragment.len());
        Ok(())
    }

    fn shows_placeholder(&self) -> bool {
        self.placeholder_shown
    }

    fn show_placeholder(&mut self, placeholder: &str) {
        self.markup = placeholder.to_owned();
        self.placeholder_shown = true;
        self.caret = None;
    }

    fn clear_placeholder(&mut self) {
        if self.placeholder_shown {
            self.markup.clear();
            self.placeholder_shown = false;
            self.caret = Some(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_follows_caret() {
        let mut surface = HeadlessSurface::new();
        surface.set_live_content("ac");
        surface.set_caret(Some(1));
        surface.type_text("b");
        assert_eq!(surface.live_content(), "abc");
        assert_eq!(surface.caret(), Some(2));
    }

    #[test]
    fn caret_snaps_to_char_boundary() {
        let mut surface = HeadlessSurface::new();
        surface.set_live_content("π");
        surface.set_caret(Some(1));
        assert_eq!(surface.caret(), Some(0));
    }

    #[test]
    fn composition_updates_replace_previous_chars() {
        let mut surface = HeadlessSurface::new();
        surface.type_text("x ");
        surface.type_text("n");
        surface.replace_before_caret(1, "ni");
        surface.replace_before_caret(2, "你");
        assert_eq!(surface.live_content(), "x 你");
    }

    #[test]
    fn insertion_needs_a_caret() {
        let mut surface = HeadlessSurface::new();
        surface.show_placeholder("Write here");
        let err = surface.insert_at_caret("x").unwrap_err();
        assert_eq!(err.to_string(), "surface has no caret");
        surface.clear_placeholder();
        assert!(surface.insert_at_caret("x").is_ok());
        assert_eq!(surface.live_content(), "x");
    }

    #[test]
    fn blank_detection() {
        let mut surface = HeadlessSurface::new();
        assert!(surface.is_blank());
        surface.set_live_content("  <br>\n");
        assert!(surface.is_blank());
        surface.set_live_content(r#"<img src="data:image/png;base64,AA">"#);
        assert!(!surface.is_blank());
        surface.set_live_content("<table></table>");
        assert!(!surface.is_blank());
        surface.set_live_content(" a ");
        assert!(!surface.is_blank());
    }
}

//! Expanded editing of one field in a larger modal.

use crate::config::EditorConfig;
use crate::session::EditorSession;
use crate::surface::EditableSurface;

/// A full editor session over a working copy of a field's value.
///
/// Nothing reaches the field until [`confirm`](Self::confirm); dropping or
/// [`cancel`](Self::cancel)ling throws the working copy away.
pub struct ExpandedEditor<S> {
    original: String,
    session: EditorSession<S>,
}

impl<S: EditableSurface> ExpandedEditor<S> {
    pub fn open(surface: S, config: EditorConfig, value: &str) -> Self {
        Self {
            original: value.to_owned(),
            session: EditorSession::with_value(surface, config, value),
        }
    }

    pub fn session(&self) -> &EditorSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession<S> {
        &mut self.session
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Working copy differs from the value the modal opened with.
    pub fn is_dirty(&self) -> bool {
        self.session.canonical_value() != self.original
    }

    /// Hand back the working copy as the new value.
    pub fn confirm(mut self) -> String {
        if self.session.is_composing() {
            self.session.composition_end();
        }
        self.session.canonical_value()
    }

    pub fn cancel(self) {
        tracing::debug!(dirty = self.is_dirty(), "expanded editor cancelled");
    }
}

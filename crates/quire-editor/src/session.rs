//! Dual-mode editor session.
//!
//! One session owns one field's canonical value. In [`EditorMode::Raw`] the
//! author edits that string through a plain text input; in
//! [`EditorMode::Preview`] they edit a rendered [`EditableSurface`] and the
//! canonical value follows the surface's live markup.
//!
//! Listeners registered with [`EditorSession::subscribe`] hear about every
//! change to the canonical value, whatever caused it, and only real changes.
//!
//! Text runs reach the surface escaped; only sanitized table and image
//! fragments are ever live markup there.

use quire_content::{content_from_surface, render};

use crate::config::EditorConfig;
use crate::draft::{MathDraft, TableDraft};
use crate::surface::EditableSurface;
use crate::text::{ContentRope, TextBuffer};
use crate::types::{CompositionState, EditorMode, Selection};
use crate::uploads::{ClipboardData, EmbeddedImage, PasteAction};

/// Handle returned by [`EditorSession::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&str)>;

pub struct EditorSession<S> {
    mode: EditorMode,
    content: ContentRope,
    /// Caret/selection of the raw text input, in chars.
    raw_selection: Selection,
    composition: Option<CompositionState>,
    surface: S,
    config: EditorConfig,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<S: EditableSurface> EditorSession<S> {
    /// Empty session in preview mode, surface showing the placeholder.
    pub fn new(surface: S, config: EditorConfig) -> Self {
        let mut session = Self {
            mode: EditorMode::Preview,
            content: ContentRope::new(),
            raw_selection: Selection::default(),
            composition: None,
            surface,
            config,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        session.load_surface();
        session
    }

    /// Session preloaded with previously saved content.
    pub fn with_value(surface: S, config: EditorConfig, value: &str) -> Self {
        let mut session = Self::new(surface, config);
        session.content.set(value);
        session.raw_selection = Selection::collapsed(session.content.len_chars());
        session.load_surface();
        session
    }

    pub fn canonical_value(&self) -> String {
        self.content.to_string()
    }

    /// Load content from outside, e.g. a saved answer.
    pub fn set_canonical_value(&mut self, value: &str) {
        self.commit(value);
        self.raw_selection = self.raw_selection.clamped(self.content.len_chars());
        if self.mode == EditorMode::Preview {
            self.load_surface();
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn is_composing(&self) -> bool {
        self.composition.is_some()
    }

    pub fn raw_selection(&self) -> Selection {
        self.raw_selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The host reports surface edits through the event methods below.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&str) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        if mode == self.mode {
            return;
        }
        match mode {
            EditorMode::Raw => {
                if self.composition.take().is_some() {
                    tracing::debug!("composition interrupted by mode switch");
                }
                let live = self.read_surface();
                self.commit(&content_from_surface(&live));
                self.raw_selection = Selection::collapsed(self.content.len_chars());
            }
            EditorMode::Preview => self.load_surface(),
        }
        tracing::debug!(from = ?self.mode, to = ?mode, "editor mode changed");
        self.mode = mode;
    }

    /// The raw input reported a new value and caret.
    pub fn raw_input(&mut self, value: &str, selection: Selection) {
        if self.mode != EditorMode::Raw {
            return;
        }
        self.commit(value);
        self.raw_selection = selection.clamped(self.content.len_chars());
    }

    pub fn set_raw_selection(&mut self, selection: Selection) {
        self.raw_selection = selection.clamped(self.content.len_chars());
    }

    /// A content-changing input event on the preview surface.
    pub fn input(&mut self) {
        if self.mode != EditorMode::Preview {
            return;
        }
        if let Some(composition) = self.composition.as_mut() {
            composition.deferred_inputs += 1;
            tracing::debug!(
                deferred = composition.deferred_inputs,
                "input deferred during composition"
            );
            return;
        }
        self.sync_from_surface();
    }

    pub fn composition_start(&mut self) {
        if self.mode != EditorMode::Preview {
            return;
        }
        if self.surface.shows_placeholder() {
            self.surface.clear_placeholder();
        }
        self.composition = Some(CompositionState::default());
    }

    /// Ends the composition and flushes the surface once.
    pub fn composition_end(&mut self) {
        if self.mode != EditorMode::Preview {
            return;
        }
        let deferred = self
            .composition
            .take()
            .map_or(0, |composition| composition.deferred_inputs);
        tracing::debug!(deferred, "composition ended, flushing surface");
        self.sync_from_surface();
    }

    pub fn focus(&mut self) {
        if self.mode == EditorMode::Preview && self.surface.shows_placeholder() {
            self.surface.clear_placeholder();
        }
    }

    pub fn blur(&mut self) {
        if self.mode != EditorMode::Preview || self.is_composing() {
            return;
        }
        if self.surface.shows_placeholder() || self.surface.is_blank() {
            self.surface.show_placeholder(&self.config.placeholder);
            self.commit("");
        }
    }

    /// Insert a finished fragment at the current position of the active mode.
    pub fn insert_fragment(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        match self.mode {
            EditorMode::Raw => {
                let selection = self.raw_selection.clamped(self.content.len_chars());
                self.content.replace(selection.to_range(), fragment);
                self.raw_selection =
                    Selection::collapsed(selection.start() + fragment.chars().count());
                self.notify();
            }
            EditorMode::Preview => {
                if self.surface.shows_placeholder() {
                    self.surface.clear_placeholder();
                }
                let markup = render(fragment).to_surface_markup();
                if let Err(err) = self.surface.insert_at_caret(&markup) {
                    tracing::debug!(error = %err, "native insertion failed, appending fragment");
                    let mut live = self.surface.live_content();
                    live.push_str(&markup);
                    self.surface.set_live_content(&live);
                }
                self.sync_from_surface();
            }
        }
    }

    /// Confirm the math dialog. An empty draft inserts nothing.
    pub fn insert_math(&mut self, draft: MathDraft) {
        if draft.is_empty() {
            return;
        }
        self.insert_fragment(&draft.into_fragment());
    }

    /// Confirm the table dialog.
    pub fn insert_table(&mut self, draft: TableDraft) {
        let fragment = draft.into_fragment(self.config.escape_table_cells);
        self.insert_fragment(&fragment);
    }

    pub fn insert_image(&mut self, image: &EmbeddedImage) {
        let fragment = image.to_fragment(&self.config.image_max_width);
        self.insert_fragment(&fragment);
    }

    /// Decide whether a paste is intercepted as an image insertion.
    pub fn paste(&self, clipboard: &ClipboardData) -> PasteAction {
        match clipboard.image() {
            Some(file) => {
                tracing::debug!(name = %file.name, "paste intercepted as image");
                PasteAction::InsertImage(file.clone())
            }
            None => PasteAction::Default,
        }
    }

    fn load_surface(&mut self) {
        if self.content.is_empty() {
            self.surface.show_placeholder(&self.config.placeholder);
        } else {
            let markup = render(&self.content.to_string()).to_surface_markup();
            self.surface.set_live_content(&markup);
        }
    }

    /// Live surface markup, never including placeholder text.
    fn read_surface(&mut self) -> String {
        let live = self.surface.live_content();
        if !self.surface.shows_placeholder() {
            return live;
        }
        // Typed next to the placeholder without a focus event first.
        let typed = live
            .strip_prefix(self.config.placeholder.as_str())
            .unwrap_or_default()
            .to_owned();
        if typed.is_empty() {
            return typed;
        }
        self.surface.set_live_content(&typed);
        typed
    }

    fn sync_from_surface(&mut self) {
        let live = self.read_surface();
        tracing::trace!(len = live.len(), "surface synced");
        self.commit(&content_from_surface(&live));
    }

    /// Replace the value, notifying listeners if it actually changed.
    fn commit(&mut self, value: &str) -> bool {
        if self.content.eq_str(value) {
            return false;
        }
        self.content.set(value);
        self.notify();
        true
    }

    fn notify(&mut self) {
        let value = self.content.to_string();
        for (_, listener) in &mut self.listeners {
            listener(&value);
        }
    }
}

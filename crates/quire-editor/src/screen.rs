//! An authoring screen: the sibling answer fields of one template and the
//! upload state they share.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::config::EditorConfig;
use crate::error::{ImageInsertError, ReadError};
use crate::modal::ExpandedEditor;
use crate::session::EditorSession;
use crate::surface::EditableSurface;
use crate::types::FieldKey;
use crate::uploads::{
    ClipboardData, EmbedReader, EmbeddedImage, PasteAction, PickedFile, UploadTicket,
    UploadTracker, validate_image,
};

/// What happened to a finished upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Inserted,
    /// The upload was abandoned (dialog closed, field gone) before it finished.
    Discarded,
}

pub struct AuthoringScreen<S> {
    config: EditorConfig,
    fields: BTreeMap<FieldKey, EditorSession<S>>,
    uploads: UploadTracker,
}

impl<S: EditableSurface> AuthoringScreen<S> {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            fields: BTreeMap::new(),
            uploads: UploadTracker::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Add a field with saved content, replacing any field with the same key.
    pub fn add_field(&mut self, key: FieldKey, surface: S, value: &str) -> &mut EditorSession<S> {
        let session = EditorSession::with_value(surface, self.config.clone(), value);
        match self.fields.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        }
    }

    pub fn field(&self, key: &FieldKey) -> Option<&EditorSession<S>> {
        self.fields.get(key)
    }

    pub fn field_mut(&mut self, key: &FieldKey) -> Option<&mut EditorSession<S>> {
        self.fields.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields.keys()
    }

    /// Current value of every field, in key order.
    pub fn values(&self) -> impl Iterator<Item = (&FieldKey, String)> {
        self.fields
            .iter()
            .map(|(key, session)| (key, session.canonical_value()))
    }

    /// Whether the field's image trigger should be disabled.
    pub fn is_uploading(&self, key: &FieldKey) -> bool {
        self.uploads.is_uploading(key)
    }

    /// Validate the file and mark the field as uploading.
    ///
    /// Nothing is marked when validation fails.
    pub fn begin_image_upload(
        &mut self,
        key: &FieldKey,
        file: &PickedFile,
    ) -> Result<UploadTicket, ImageInsertError> {
        if !self.fields.contains_key(key) {
            return Err(ImageInsertError::UnknownField(key.clone()));
        }
        validate_image(file, self.config.max_image_bytes)?;
        self.uploads.begin(key.clone(), file.name.clone())
    }

    /// Stop waiting for the field's upload; its result will be discarded.
    pub fn abandon_image_upload(&mut self, key: &FieldKey) -> bool {
        self.uploads.abandon(key)
    }

    /// Apply the reader's result. The field's uploading flag is cleared
    /// whatever the outcome.
    pub fn finish_image_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<EmbeddedImage, ReadError>,
    ) -> Result<UploadOutcome, ImageInsertError> {
        let key = ticket.key().clone();
        let name = ticket.name().clone();
        if !self.uploads.finish(ticket) {
            tracing::warn!(field = %key, %name, "upload result arrived after it was abandoned");
            return Ok(UploadOutcome::Discarded);
        }
        let image = result.map_err(|source| ImageInsertError::Read { name, source })?;
        match self.fields.get_mut(&key) {
            Some(session) => {
                session.insert_image(&image);
                Ok(UploadOutcome::Inserted)
            }
            None => {
                tracing::warn!(field = %key, "upload finished for a removed field");
                Ok(UploadOutcome::Discarded)
            }
        }
    }

    /// Validate, read and insert in one go.
    ///
    /// Holds the screen for the whole read; hosts that keep editing sibling
    /// fields meanwhile use the begin/finish pair instead. Dropping the
    /// future mid-read discards the upload and clears the field's flag.
    pub async fn upload_image<R: EmbedReader>(
        &mut self,
        key: &FieldKey,
        file: PickedFile,
        reader: &R,
    ) -> Result<UploadOutcome, ImageInsertError> {
        let ticket = self.begin_image_upload(key, &file)?;
        let result = reader.read_embeddable(&file).await;
        self.finish_image_upload(ticket, result)
    }

    /// Handle a paste on a field. `Ok(None)` means the host should paste normally.
    pub async fn paste<R: EmbedReader>(
        &mut self,
        key: &FieldKey,
        clipboard: &ClipboardData,
        reader: &R,
    ) -> Result<Option<UploadOutcome>, ImageInsertError> {
        let action = self
            .fields
            .get(key)
            .ok_or_else(|| ImageInsertError::UnknownField(key.clone()))?
            .paste(clipboard);
        match action {
            PasteAction::Default => Ok(None),
            PasteAction::InsertImage(file) => self.upload_image(key, file, reader).await.map(Some),
        }
    }

    /// Open a modal editor on a copy of the field's value.
    pub fn open_expanded(&self, key: &FieldKey, surface: S) -> Option<ExpandedEditor<S>> {
        let session = self.fields.get(key)?;
        Some(ExpandedEditor::open(
            surface,
            self.config.clone(),
            &session.canonical_value(),
        ))
    }

    /// Write a confirmed modal's working copy back to the field.
    pub fn commit_expanded(&mut self, key: &FieldKey, editor: ExpandedEditor<S>) -> bool {
        let Some(session) = self.fields.get_mut(key) else {
            editor.cancel();
            return false;
        };
        session.set_canonical_value(&editor.confirm());
        true
    }
}

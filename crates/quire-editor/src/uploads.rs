//! Image upload pipeline: validation, the embeddable-data reader and the
//! per-field "uploading" tracker.
//!
//! An upload runs in three steps so that the host never blocks keystrokes on
//! sibling fields:
//!
//! 1. [`UploadTracker::begin`] after [`validate_image`], which marks the field busy.
//! 2. The host awaits an [`EmbedReader`].
//! 3. [`UploadTracker::finish`] clears the flag and says whether to insert.
//!
//! Dropping the [`UploadTicket`] instead of finishing it also clears the flag.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use mime_sniffer::MimeTypeSniffer;
use quire_content::sanitize;
use smol_str::SmolStr;

use crate::error::{ImageInsertError, ReadError};
use crate::types::FieldKey;

/// A file the author picked or pasted.
#[derive(Clone, Debug)]
pub struct PickedFile {
    /// Display name, used in error messages.
    pub name: SmolStr,
    /// MIME type reported by the picker or clipboard, if any.
    pub declared_type: Option<String>,
    pub data: Bytes,
}

impl PickedFile {
    pub fn new(name: impl Into<SmolStr>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            data: data.into(),
        }
    }

    pub fn with_declared_type(mut self, mime_type: impl Into<String>) -> Self {
        self.declared_type = Some(mime_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Declared type when present, otherwise sniffed from the bytes.
    pub fn mime_type(&self) -> String {
        match self.declared_type.as_deref() {
            Some(declared) if !declared.trim().is_empty() => declared.trim().to_ascii_lowercase(),
            _ => self
                .data
                .sniff_mime_type()
                .unwrap_or("application/octet-stream")
                .to_string(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type().starts_with("image/")
    }
}

/// A file converted into a self-contained inline reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
    pub mime_type: String,
}

impl EmbeddedImage {
    /// Sanitized image markup constrained to `max_width`.
    pub fn to_fragment(&self, max_width: &str) -> String {
        sanitize(&format!(
            r#"<img src="{}" style="max-width: {}; height: auto;">"#,
            self.data_url, max_width
        ))
    }
}

/// The "read file as embeddable data" collaborator.
pub trait EmbedReader {
    fn read_embeddable(
        &self,
        file: &PickedFile,
    ) -> impl Future<Output = Result<EmbeddedImage, ReadError>>;
}

/// Reads the picked bytes straight into a base64 `data:` URL.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineDataReader;

impl InlineDataReader {
    pub fn encode(file: &PickedFile) -> Result<EmbeddedImage, ReadError> {
        if file.is_empty() {
            return Err(ReadError::new(format!("{} has no data", file.name)));
        }
        let mime_type = file.mime_type();
        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(&file.data));
        Ok(EmbeddedImage {
            data_url,
            mime_type,
        })
    }
}

impl EmbedReader for InlineDataReader {
    async fn read_embeddable(&self, file: &PickedFile) -> Result<EmbeddedImage, ReadError> {
        Self::encode(file)
    }
}

/// Reject a file before any read starts.
pub fn validate_image(file: &PickedFile, max_bytes: usize) -> Result<(), ImageInsertError> {
    if file.is_empty() {
        return Err(ImageInsertError::EmptyFile(file.name.clone()));
    }
    if file.len() > max_bytes {
        return Err(ImageInsertError::TooLarge {
            name: file.name.clone(),
            size: file.len(),
            limit: max_bytes,
        });
    }
    let mime = file.mime_type();
    if !mime.starts_with("image/") {
        return Err(ImageInsertError::NotAnImage {
            name: file.name.clone(),
            mime,
        });
    }
    Ok(())
}

type Slots = HashMap<FieldKey, UploadSlot>;

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Proof that a field's upload was started. Hand it back to finish.
///
/// Dropping a ticket without finishing (the host cancelled the read, or the
/// future holding it was dropped) clears the field's flag and discards the
/// upload.
#[derive(Debug)]
pub struct UploadTicket {
    key: FieldKey,
    name: SmolStr,
    id: u64,
    slots: Weak<Mutex<Slots>>,
}

impl UploadTicket {
    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    /// Name of the file being uploaded.
    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    /// Remove this ticket's slot. `None` if it was already gone, otherwise
    /// whether the upload is still wanted.
    fn release(&self) -> Option<bool> {
        let slots = self.slots.upgrade()?;
        let mut slots = lock(&slots);
        match slots.get(&self.key) {
            Some(slot) if slot.id == self.id => {
                let wanted = !slot.abandoned;
                slots.remove(&self.key);
                Some(wanted)
            }
            _ => None,
        }
    }
}

impl Drop for UploadTicket {
    fn drop(&mut self) {
        if self.release().is_some() {
            tracing::debug!(field = %self.key, id = self.id, "upload dropped before it finished");
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct UploadSlot {
    id: u64,
    abandoned: bool,
}

/// Fields with an upload in flight, shared by the sibling fields of one screen.
///
/// A key stays present until its ticket is finished or dropped, even when
/// abandoned, so a field can never have two overlapping uploads.
#[derive(Debug, Default)]
pub struct UploadTracker {
    slots: Arc<Mutex<Slots>>,
    next_id: u64,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(
        &mut self,
        key: FieldKey,
        name: impl Into<SmolStr>,
    ) -> Result<UploadTicket, ImageInsertError> {
        let mut slots = lock(&self.slots);
        if slots.contains_key(&key) {
            return Err(ImageInsertError::AlreadyUploading(key));
        }
        let id = self.next_id;
        self.next_id += 1;
        slots.insert(
            key.clone(),
            UploadSlot {
                id,
                abandoned: false,
            },
        );
        let name = name.into();
        tracing::debug!(field = %key, %name, id, "upload started");
        Ok(UploadTicket {
            key,
            name,
            id,
            slots: Arc::downgrade(&self.slots),
        })
    }

    /// Mark the field's upload as no longer wanted. Returns false if none was running.
    pub fn abandon(&mut self, key: &FieldKey) -> bool {
        match lock(&self.slots).get_mut(key) {
            Some(slot) => {
                slot.abandoned = true;
                tracing::debug!(field = %key, id = slot.id, "upload abandoned");
                true
            }
            None => false,
        }
    }

    /// Clear the field's flag. Returns whether the result should be applied.
    pub fn finish(&mut self, ticket: UploadTicket) -> bool {
        if !Weak::ptr_eq(&ticket.slots, &Arc::downgrade(&self.slots)) {
            tracing::warn!(field = %ticket.key, "ticket belongs to another screen");
            return false;
        }
        let wanted = ticket.release().unwrap_or(false);
        tracing::debug!(field = %ticket.key, id = ticket.id, wanted, "upload finished");
        wanted
    }

    pub fn is_uploading(&self, key: &FieldKey) -> bool {
        lock(&self.slots).contains_key(key)
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.slots).len()
    }
}

/// What a paste event carries.
#[derive(Clone, Debug, Default)]
pub struct ClipboardData {
    pub text: Option<String>,
    pub files: Vec<PickedFile>,
}

impl ClipboardData {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: PickedFile) -> Self {
        self.files.push(file);
        self
    }

    /// First clipboard item that is an image.
    pub fn image(&self) -> Option<&PickedFile> {
        self.files.iter().find(|file| file.is_image())
    }
}

/// How the host should treat a paste event.
#[derive(Clone, Debug)]
pub enum PasteAction {
    /// Let the surface perform its default text paste.
    Default,
    /// Suppress the default paste and insert this image instead.
    InsertImage(PickedFile),
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn png(name: &str) -> PickedFile {
        PickedFile::new(name, PNG_HEADER.to_vec())
    }

    #[test]
    fn mime_type_is_sniffed_when_undeclared() {
        assert_eq!(png("a.png").mime_type(), "image/png");
        let declared = PickedFile::new("a", b"whatever".to_vec()).with_declared_type("IMAGE/GIF");
        assert_eq!(declared.mime_type(), "image/gif");
    }

    #[test]
    fn validation_rejects_before_reading() {
        let limit = 8;
        assert!(matches!(
            validate_image(&png("big.png"), limit),
            Err(ImageInsertError::TooLarge { size: 16, limit: 8, .. })
        ));
        assert!(matches!(
            validate_image(&PickedFile::new("empty.png", Vec::new()), limit),
            Err(ImageInsertError::EmptyFile(_))
        ));
        let text = PickedFile::new("notes.txt", b"hello".to_vec()).with_declared_type("text/plain");
        assert!(matches!(
            validate_image(&text, limit),
            Err(ImageInsertError::NotAnImage { .. })
        ));
        assert!(validate_image(&png("ok.png"), 1024).is_ok());
    }

    #[test]
    fn inline_reader_builds_data_url() {
        let image = InlineDataReader::encode(&png("a.png")).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert!(image.data_url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn image_fragment_is_sized_and_sanitized() {
        let image = EmbeddedImage {
            data_url: "data:image/png;base64,iVBORw0KGgo=".to_owned(),
            mime_type: "image/png".to_owned(),
        };
        insta::assert_snapshot!(
            image.to_fragment("480px"),
            @r#"<img src="data:image/png;base64,iVBORw0KGgo=" style="max-width: 480px; height: auto;">"#
        );
        assert_eq!(
            image.to_fragment("url(x)"),
            r#"<img src="data:image/png;base64,iVBORw0KGgo=">"#
        );
    }

    #[test]
    fn tracker_refuses_overlap_on_same_field() {
        let mut tracker = UploadTracker::new();
        let a = FieldKey::new(1, "answer");
        let b = FieldKey::new(2, "answer");

        let ticket = tracker.begin(a.clone(), "a.png").unwrap();
        assert!(matches!(
            tracker.begin(a.clone(), "again.png"),
            Err(ImageInsertError::AlreadyUploading(_))
        ));
        let other = tracker.begin(b.clone(), "b.png").unwrap();
        assert_eq!(tracker.in_flight(), 2);

        assert!(tracker.finish(ticket));
        assert!(!tracker.is_uploading(&a));
        assert!(tracker.is_uploading(&b));
        assert!(tracker.finish(other));
    }

    #[test]
    fn abandoned_upload_clears_without_applying() {
        let mut tracker = UploadTracker::new();
        let key = FieldKey::new(1, "answer");
        let ticket = tracker.begin(key.clone(), "late.png").unwrap();
        assert!(tracker.abandon(&key));
        assert!(tracker.is_uploading(&key));
        assert!(!tracker.finish(ticket));
        assert!(!tracker.is_uploading(&key));
        assert!(!tracker.abandon(&key));
    }

    #[test]
    fn dropped_ticket_releases_field() {
        let mut tracker = UploadTracker::new();
        let key = FieldKey::new(1, "answer");

        let ticket = tracker.begin(key.clone(), "a.png").unwrap();
        drop(ticket);
        assert!(!tracker.is_uploading(&key));

        let ticket = tracker.begin(key.clone(), "b.png").unwrap();
        assert!(tracker.abandon(&key));
        drop(ticket);
        assert_eq!(tracker.in_flight(), 0);
        assert!(tracker.begin(key, "c.png").is_ok());
    }

    #[test]
    fn stale_ticket_leaves_newer_upload_alone() {
        let mut tracker = UploadTracker::new();
        let key = FieldKey::new(1, "answer");
        let mut other = UploadTracker::new();

        let foreign = other.begin(key.clone(), "a.png").unwrap();
        let ticket = tracker.begin(key.clone(), "b.png").unwrap();
        assert!(!tracker.finish(foreign));
        assert!(tracker.is_uploading(&key));
        assert!(!other.is_uploading(&key));
        assert!(tracker.finish(ticket));
    }

    #[test]
    fn clipboard_image_detection() {
        assert!(ClipboardData::from_text("hi").image().is_none());
        let data = ClipboardData::from_text("caption").with_file(png("shot.png"));
        assert_eq!(data.image().map(|f| f.name.as_str()), Some("shot.png"));
    }
}

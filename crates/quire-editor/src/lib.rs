//! quire-editor: the interactive half of the rich-content engine.
//!
//! An [`EditorSession`] owns one field's canonical content string and keeps it
//! current while the author switches between the raw text input and the
//! rendered [`EditableSurface`]. An [`AuthoringScreen`] groups the sibling
//! fields of one template and tracks their image uploads.
//!
//! The pure content functions live in `quire-content`; this crate only
//! decides when they run and where their output goes.

pub mod config;
pub mod draft;
pub mod error;
pub mod modal;
pub mod screen;
pub mod session;
pub mod surface;
pub mod text;
pub mod types;
pub mod uploads;

pub use config::{DEFAULT_MAX_IMAGE_BYTES, EditorConfig};
pub use draft::{MathDraft, TableDraft};
pub use error::{ImageInsertError, ReadError};
pub use modal::ExpandedEditor;
pub use screen::{AuthoringScreen, UploadOutcome};
pub use session::{EditorSession, SubscriptionId};
pub use surface::{EditableSurface, HeadlessSurface, SurfaceError};
pub use text::{ContentRope, TextBuffer};
pub use types::{CompositionState, EditorMode, FieldKey, Selection};
pub use uploads::{
    ClipboardData, EmbedReader, EmbeddedImage, InlineDataReader, PasteAction, PickedFile,
    UploadTicket, UploadTracker, validate_image,
};

pub use quire_content;

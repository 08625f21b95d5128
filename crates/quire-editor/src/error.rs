use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

use crate::types::FieldKey;

#[derive(Debug, Error, Diagnostic)]
pub enum ImageInsertError {
    #[error("{name} is {size} bytes, over the {limit} byte image limit")]
    #[diagnostic(
        code(quire::image::too_large),
        help("choose a smaller image or reduce its resolution")
    )]
    TooLarge {
        name: SmolStr,
        size: usize,
        limit: usize,
    },

    #[error("{name} is not an image ({mime})")]
    #[diagnostic(code(quire::image::not_an_image))]
    NotAnImage { name: SmolStr, mime: String },

    #[error("{0} is empty")]
    #[diagnostic(code(quire::image::empty))]
    EmptyFile(SmolStr),

    #[error("an image upload is already in progress for {0}")]
    #[diagnostic(code(quire::image::already_uploading))]
    AlreadyUploading(FieldKey),

    #[error("no field {0} on this screen")]
    #[diagnostic(code(quire::image::unknown_field))]
    UnknownField(FieldKey),

    #[error("failed to read {name}")]
    #[diagnostic(code(quire::image::read))]
    Read {
        name: SmolStr,
        #[source]
        source: ReadError,
    },
}

/// Failure reported by an [`EmbedReader`](crate::uploads::EmbedReader).
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(quire::reader))]
pub struct ReadError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ReadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

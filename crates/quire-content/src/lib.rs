//! quire-content: the pure half of the rich-content engine.
//!
//! This crate provides:
//! - [`convert`] - math notation to Unicode symbol conversion
//! - [`GridTable`] - grid table model with markup and plain-text builders
//! - [`sanitize`] - allowlist sanitizer for embedded fragments
//! - [`parse`] - lazy splitting of content strings into segments
//! - [`render`] - read-only presentation built on the parser
//!
//! Everything here is total: no function returns an error, unrecognised input
//! is passed through or reclassified as text.

pub mod convert;
pub mod grid;
pub mod parse;
pub mod render;
pub mod sanitize;

pub use convert::{NotationRule, convert, subscript, superscript};
pub use grid::GridTable;
pub use parse::{ParsedSegment, Segments, parse};
pub use render::{
    FragmentKind, RenderNode, Rendered, content_from_surface, render, render_html,
};
pub use sanitize::{AllowedElement, sanitize};

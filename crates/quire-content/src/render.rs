//! Read-only rendering of content strings.
//!
//! Used by feedback views, report export and the editor's preview surface.
//! Rendering never mutates anything; it is parse + per-segment presentation.

use std::borrow::Cow;

use pulldown_cmark_escape::{escape_html, escape_html_body_text};

use crate::parse::{ParsedSegment, parse};

/// Entities a surface may hold in its text runs, decoded on read-back.
const SURFACE_ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#39;", '\''),
    ("&#x27;", '\''),
    ("&apos;", '\''),
    ("&nbsp;", '\u{a0}'),
];

/// Style applied to text runs so line breaks and indentation survive.
pub const TEXT_STYLE: &str = "white-space: pre-wrap;";

/// Kind of an embedded, already-sanitized fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Table,
    Image,
}

/// A node in the rendered presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    /// Author text; shown with whitespace preserved.
    Text(String),
    /// Sanitized markup, injected as-is.
    Fragment { kind: FragmentKind, markup: String },
}

/// Rendered presentation of one content string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub nodes: Vec<RenderNode>,
}

impl Rendered {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether anything other than whitespace-only text was rendered.
    pub fn has_visible_content(&self) -> bool {
        self.nodes.iter().any(|node| match node {
            RenderNode::Text(text) => !text.trim().is_empty(),
            RenderNode::Fragment { .. } => true,
        })
    }

    /// Presentation markup for read-only views.
    ///
    /// Text is HTML-escaped inside a `pre-wrap` span; fragments are emitted verbatim.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                RenderNode::Text(text) => {
                    out.push_str(r#"<span class="quire-text" style=""#);
                    out.push_str(TEXT_STYLE);
                    out.push_str(r#"">"#);
                    // Writing to a String can't fail.
                    let _ = escape_html(&mut out, text);
                    out.push_str("</span>");
                }
                RenderNode::Fragment { markup, .. } => out.push_str(markup),
            }
        }
        out
    }

    /// Markup for the editable preview surface.
    ///
    /// Text is HTML-escaped so that only sanitized fragments are live markup.
    /// [`content_from_surface`] reverses this, so an unedited surface reads
    /// back as the same content string.
    pub fn to_surface_markup(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                // Writing to a String can't fail.
                RenderNode::Text(text) => {
                    let _ = escape_html_body_text(&mut out, text);
                }
                RenderNode::Fragment { markup, .. } => out.push_str(markup),
            }
        }
        out
    }
}

impl From<ParsedSegment> for RenderNode {
    fn from(segment: ParsedSegment) -> Self {
        match segment {
            ParsedSegment::Text(text) => RenderNode::Text(text),
            ParsedSegment::Table(markup) => RenderNode::Fragment {
                kind: FragmentKind::Table,
                markup,
            },
            ParsedSegment::Image(markup) => RenderNode::Fragment {
                kind: FragmentKind::Image,
                markup,
            },
        }
    }
}

/// Render a content string.
pub fn render(content: &str) -> Rendered {
    Rendered {
        nodes: parse(content).map(RenderNode::from).collect(),
    }
}

/// Render straight to read-only HTML, e.g. for report export.
pub fn render_html(content: &str) -> String {
    render(content).to_html()
}

/// Read an editable surface's live markup back into a content string.
///
/// Text runs are unescaped; table and image fragments stay markup.
pub fn content_from_surface(markup: &str) -> String {
    parse(markup)
        .map(|segment| match segment {
            ParsedSegment::Text(text) => unescape_text(&text).into_owned(),
            ParsedSegment::Table(markup) | ParsedSegment::Image(markup) => markup,
        })
        .collect()
}

/// Decode [`SURFACE_ENTITIES`] in one pass. Unknown entities are kept as typed.
fn unescape_text(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match SURFACE_ENTITIES
            .iter()
            .find(|(entity, _)| rest.starts_with(entity))
        {
            Some((entity, decoded)) => {
                out.push(*decoded);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_renders_nothing() {
        let rendered = render("");
        assert!(rendered.is_empty());
        assert_eq!(rendered.to_html(), "");
        assert!(!render("  \n").has_visible_content());
    }

    #[test]
    fn text_is_escaped_and_keeps_whitespace() {
        assert_eq!(
            render_html("a < b\n  & c"),
            "<span class=\"quire-text\" style=\"white-space: pre-wrap;\">a &lt; b\n  &amp; c</span>"
        );
    }

    #[test]
    fn fragments_are_injected_sanitized() {
        let html = render_html("x<table onclick=\"y\"><tr><td>1</td></tr></table>");
        assert!(html.ends_with("<table><tr><td>1</td></tr></table>"));
        assert!(!html.contains("onclick"));
    }

    #[test]
    fn surface_markup_round_trips_sanitized_content() {
        let content = "Answer:\n<table><tr><td>1</td></tr></table>\nsee ⅓";
        assert_eq!(render(content).to_surface_markup(), content);
        assert_eq!(content_from_surface(content), content);
    }

    #[test]
    fn surface_text_is_never_live_markup() {
        let content = "hi <svg onload=alert(1)></svg><details open ontoggle=alert(2)>x</details>";
        let markup = render(content).to_surface_markup();
        assert_eq!(
            markup,
            "hi &lt;svg onload=alert(1)&gt;&lt;/svg&gt;&lt;details open ontoggle=alert(2)&gt;x&lt;/details&gt;"
        );
        assert_eq!(content_from_surface(&markup), content);
    }

    #[test]
    fn surface_read_back_decodes_text_only() {
        let content = "a &amp; b < c\n<table><tr><td>x &lt; y</td></tr></table>";
        let markup = render(content).to_surface_markup();
        assert!(markup.starts_with("a &amp;amp; b &lt; c\n<table>"));
        assert!(markup.contains("<td>x &lt; y</td>"));
        assert_eq!(content_from_surface(&markup), content);
        assert_eq!(content_from_surface("5&nbsp;km &copy;"), "5\u{a0}km &copy;");
    }

    #[test]
    fn rendering_is_repeatable() {
        let content = "t<img src=\"data:image/png;base64,AA\">";
        assert_eq!(render(content), render(content));
        assert_eq!(render(content).nodes.len(), 2);
    }
}

//! Splits a content string into text, table and image segments.
//!
//! Parsing is lazy: [`parse`] returns an iterator that scans the content
//! left to right and yields one [`ParsedSegment`] at a time. Nothing is cached,
//! so the same content always yields the same sequence and the iterator can be
//! recreated whenever the content changes.

use crate::sanitize::{find_tag_end, sanitize, tag_name_is};

/// One renderable piece of a content string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSegment {
    /// Author text, whitespace preserved exactly.
    Text(String),
    /// Sanitized table markup.
    Table(String),
    /// Sanitized image markup.
    Image(String),
}

impl ParsedSegment {
    /// The segment's text or markup.
    pub fn as_str(&self) -> &str {
        match self {
            ParsedSegment::Text(s) | ParsedSegment::Table(s) | ParsedSegment::Image(s) => s,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ParsedSegment::Text(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Table,
    Image,
}

/// Parse `content` into segments.
///
/// An empty string yields no segments; a string without embedded fragments
/// yields a single [`ParsedSegment::Text`] equal to the input.
pub fn parse(content: &str) -> Segments<'_> {
    Segments {
        content,
        lower: content.to_ascii_lowercase(),
        pos: 0,
        pending: None,
    }
}

/// Iterator returned by [`parse`].
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    content: &'a str,
    lower: String,
    pos: usize,
    pending: Option<ParsedSegment>,
}

impl Iterator for Segments<'_> {
    type Item = ParsedSegment;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(segment) = self.pending.take() {
            return Some(segment);
        }
        if self.pos >= self.content.len() {
            return None;
        }

        let start = self.pos;
        let Some((marker_at, marker)) = self.find_marker(start) else {
            self.pos = self.content.len();
            return Some(ParsedSegment::Text(self.content[start..].to_owned()));
        };

        let element_end = match marker {
            Marker::Table => self.find_table_end(marker_at),
            Marker::Image => find_tag_end(self.content, marker_at + "<img".len()).map(|gt| gt + 1),
        };

        let Some(end) = element_end else {
            tracing::debug!(
                ?marker,
                offset = marker_at,
                "unterminated fragment, treating remainder as text"
            );
            self.pos = self.content.len();
            return Some(ParsedSegment::Text(self.content[start..].to_owned()));
        };

        self.pos = end;
        let fragment = sanitize(&self.content[marker_at..end]);
        tracing::trace!(?marker, start = marker_at, end, "embedded fragment");
        let segment = match marker {
            Marker::Table => ParsedSegment::Table(fragment),
            Marker::Image => ParsedSegment::Image(fragment),
        };

        if marker_at > start {
            self.pending = Some(segment);
            Some(ParsedSegment::Text(self.content[start..marker_at].to_owned()))
        } else {
            Some(segment)
        }
    }
}

impl Segments<'_> {
    /// Next `<table` or `<img` tag opening at or after `from`.
    fn find_marker(&self, from: usize) -> Option<(usize, Marker)> {
        let mut pos = from;
        while let Some(offset) = self.lower[pos..].find('<') {
            let lt = pos + offset;
            let name = &self.lower[lt + 1..];
            if tag_name_is(name, "table") {
                return Some((lt, Marker::Table));
            }
            if tag_name_is(name, "img") {
                return Some((lt, Marker::Image));
            }
            pos = lt + 1;
        }
        None
    }

    /// End (exclusive) of the table opened at `open`, matching nested tables.
    fn find_table_end(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut pos = open;
        while let Some(offset) = self.lower[pos..].find('<') {
            let lt = pos + offset;
            let rest = &self.lower[lt..];
            let (closing, name_start) = if rest.starts_with("</") {
                (true, lt + 2)
            } else {
                (false, lt + 1)
            };

            if tag_name_is(&self.lower[name_start..], "table") {
                let gt = find_tag_end(self.content, name_start)?;
                if closing {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(gt + 1);
                    }
                } else {
                    depth += 1;
                }
                pos = gt + 1;
            } else {
                pos = lt + 1;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(content: &str) -> Vec<ParsedSegment> {
        parse(content).collect()
    }

    #[test]
    fn empty_content_has_no_segments() {
        assert!(segments("").is_empty());
    }

    #[test]
    fn plain_text_is_one_segment() {
        let text = "line one\n\n  indented line\t tab";
        assert_eq!(segments(text), vec![ParsedSegment::Text(text.to_owned())]);
        assert_eq!(segments("a < b"), vec![ParsedSegment::Text("a < b".into())]);
    }

    #[test]
    fn splits_text_table_text() {
        let content = "before\n<table><tr><td>A</td></tr></table>\nafter";
        assert_eq!(
            segments(content),
            vec![
                ParsedSegment::Text("before\n".into()),
                ParsedSegment::Table("<table><tr><td>A</td></tr></table>".into()),
                ParsedSegment::Text("\nafter".into()),
            ]
        );
    }

    #[test]
    fn images_are_self_contained() {
        let content = r#"<img src="data:image/png;base64,AAAA" style="max-width: 100%;" onload="x">caption"#;
        assert_eq!(
            segments(content),
            vec![
                ParsedSegment::Image(
                    r#"<img src="data:image/png;base64,AAAA" style="max-width: 100%;">"#.into()
                ),
                ParsedSegment::Text("caption".into()),
            ]
        );
    }

    #[test]
    fn fragments_are_sanitized() {
        let content = r#"<TABLE onclick="x"><tr><td>1<script>evil()</script></td></tr></TABLE>"#;
        assert_eq!(
            segments(content),
            vec![ParsedSegment::Table("<table><tr><td>1</td></tr></table>".into())]
        );
    }

    #[test]
    fn nested_table_closes_at_matching_depth() {
        let content = "<table><tr><td><table><tr><td>in</td></tr></table></td></tr></table>tail";
        let parsed = segments(content);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], ParsedSegment::Table(content[..content.len() - 4].to_owned()));
        assert_eq!(parsed[1], ParsedSegment::Text("tail".into()));
    }

    #[test]
    fn unterminated_table_is_text_from_marker() {
        let content = "intro <table><tr><td>x</td></tr> <img src=\"data:image/png;base64,AA\">";
        assert_eq!(segments(content), vec![ParsedSegment::Text(content.to_owned())]);
    }

    #[test]
    fn unterminated_image_is_text() {
        let content = "see <img src=\"data:image/png";
        assert_eq!(segments(content), vec![ParsedSegment::Text(content.to_owned())]);
    }

    #[test]
    fn unterminated_marker_after_fragment_joins_trailing_text() {
        let content = "<img src=\"data:image/png;base64,AA\"> then <table><tr>";
        assert_eq!(
            segments(content),
            vec![
                ParsedSegment::Image(r#"<img src="data:image/png;base64,AA">"#.into()),
                ParsedSegment::Text(" then <table><tr>".into()),
            ]
        );
    }

    #[test]
    fn similar_tag_names_are_not_markers() {
        let content = "<tablet> and <imgx>";
        assert_eq!(segments(content), vec![ParsedSegment::Text(content.into())]);
    }

    #[test]
    fn parsing_is_restartable() {
        let content = "a<img src=\"data:image/gif;base64,R0\">b<table></table>c";
        let first: Vec<_> = parse(content).collect();
        let second: Vec<_> = parse(content).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }
}

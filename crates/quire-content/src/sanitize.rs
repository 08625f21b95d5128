//! Allowlist sanitizer for embedded table and image fragments.
//!
//! Content strings are stored as-is and later injected as live markup into
//! other people's views, so every fragment goes through [`sanitize`] before it
//! is rendered. Only the elements in [`AllowedElement`] survive, each with its
//! own attribute allowlist. A disallowed element is removed together with its
//! content. A disallowed attribute is dropped but its element is kept.
//!
//! The output is normalised (lower-case tags, double-quoted attributes,
//! balanced open/close pairs, `<`/`>` escaped in text), which is what makes
//! `sanitize(sanitize(x)) == sanitize(x)` hold.

use std::sync::LazyLock;

use regex::Regex;

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).unwrap()
});

/// Elements whose content is never markup; they are skipped up to their close tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title", "xmp", "noscript"];

/// Elements that never have content, so removing them removes only the tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// The closed set of elements that survive sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedElement {
    Table,
    /// `thead`, `tbody` or `tfoot`; editable surfaces insert these implicitly.
    Section(TableSection),
    Row,
    Cell,
    HeaderCell,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSection {
    Head,
    Body,
    Foot,
}

/// How an allowed attribute's value is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeKind {
    Style,
    EmbeddedSource,
}

impl AllowedElement {
    /// Look up a lower-case tag name.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let element = match tag {
            "table" => AllowedElement::Table,
            "thead" => AllowedElement::Section(TableSection::Head),
            "tbody" => AllowedElement::Section(TableSection::Body),
            "tfoot" => AllowedElement::Section(TableSection::Foot),
            "tr" => AllowedElement::Row,
            "td" => AllowedElement::Cell,
            "th" => AllowedElement::HeaderCell,
            "img" => AllowedElement::Image,
            _ => return None,
        };
        Some(element)
    }

    pub fn tag(self) -> &'static str {
        match self {
            AllowedElement::Table => "table",
            AllowedElement::Section(TableSection::Head) => "thead",
            AllowedElement::Section(TableSection::Body) => "tbody",
            AllowedElement::Section(TableSection::Foot) => "tfoot",
            AllowedElement::Row => "tr",
            AllowedElement::Cell => "td",
            AllowedElement::HeaderCell => "th",
            AllowedElement::Image => "img",
        }
    }

    pub fn is_void(self) -> bool {
        matches!(self, AllowedElement::Image)
    }

    fn attribute(self, name: &str) -> Option<AttributeKind> {
        match (self, name) {
            (AllowedElement::Image, "src") => Some(AttributeKind::EmbeddedSource),
            (AllowedElement::Section(_), _) => None,
            (_, "style") => Some(AttributeKind::Style),
            _ => None,
        }
    }
}

impl AttributeKind {
    fn accepts(self, value: &str) -> bool {
        match self {
            AttributeKind::Style => is_safe_style(value),
            AttributeKind::EmbeddedSource => is_embedded_image_source(value),
        }
    }
}

/// Inline styles may not pull in resources, run script or hide tokens from the check.
fn is_safe_style(value: &str) -> bool {
    if value
        .chars()
        .any(|c| matches!(c, '"' | '\'' | '<' | '>' | '&' | '\\'))
    {
        return false;
    }
    let lower = value.to_ascii_lowercase();
    !["url(", "expression(", "javascript:", "@import", "/*", "*/"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Only self-contained `data:image/...` references are embeddable.
fn is_embedded_image_source(value: &str) -> bool {
    value.len() > "data:image/".len()
        && value
            .get(.."data:image/".len())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:image/"))
        && value.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '+' | '/' | '=' | ';' | ':' | ',' | '.' | '_' | '-')
        })
}

/// Sanitize a markup fragment against the element and attribute allowlists.
pub fn sanitize(fragment: &str) -> String {
    Sanitizer::new(fragment).run()
}

struct Sanitizer<'a> {
    input: &'a str,
    lower: String,
    pos: usize,
    out: String,
    open: Vec<AllowedElement>,
}

impl<'a> Sanitizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            lower: input.to_ascii_lowercase(),
            pos: 0,
            out: String::with_capacity(input.len()),
            open: Vec::new(),
        }
    }

    fn run(mut self) -> String {
        while self.pos < self.input.len() {
            let Some(offset) = self.input[self.pos..].find('<') else {
                self.push_text(self.pos, self.input.len());
                break;
            };
            let lt = self.pos + offset;
            self.push_text(self.pos, lt);
            self.pos = lt;
            self.step_markup();
        }

        while let Some(element) = self.open.pop() {
            self.close(element);
        }
        self.out
    }

    fn push_text(&mut self, start: usize, end: usize) {
        for c in self.input[start..end].chars() {
            match c {
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                c => self.out.push(c),
            }
        }
    }

    /// Handle whatever starts with the `<` at `self.pos`.
    fn step_markup(&mut self) {
        let rest = &self.lower[self.pos..];
        if rest.starts_with("<!--") {
            self.pos = match rest.find("-->") {
                Some(end) => self.pos + end + 3,
                None => self.input.len(),
            };
            tracing::debug!("removed comment");
            return;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            self.pos = match rest.find('>') {
                Some(end) => self.pos + end + 1,
                None => self.input.len(),
            };
            return;
        }

        let closing = rest.starts_with("</");
        let name_start = self.pos + if closing { 2 } else { 1 };
        let name_len = self.lower[name_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(self.lower.len() - name_start);
        let starts_with_letter = self.lower[name_start..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic());

        let tag_end = if starts_with_letter {
            find_tag_end(self.input, name_start + name_len)
        } else {
            None
        };
        let Some(tag_end) = tag_end else {
            // Not a tag after all.
            self.out.push_str("&lt;");
            self.pos += 1;
            return;
        };

        let input = self.input;
        let name = self.lower[name_start..name_start + name_len].to_owned();
        let attributes = &input[name_start + name_len..tag_end];
        self.pos = tag_end + 1;

        if closing {
            self.handle_close(&name);
        } else {
            let self_closing = attributes.trim_end().ends_with('/');
            self.handle_open(&name, attributes, self_closing);
        }
    }

    fn handle_open(&mut self, name: &str, attributes: &str, self_closing: bool) {
        if let Some(element) = AllowedElement::from_tag(name) {
            self.emit_open(element, attributes);
            if !element.is_void() {
                if self_closing {
                    self.close(element);
                } else {
                    self.open.push(element);
                }
            }
            return;
        }

        tracing::debug!(element = name, "removed disallowed element");
        if RAW_TEXT_ELEMENTS.contains(&name) {
            self.pos = self.skip_raw_text(name);
        } else if !self_closing && !VOID_ELEMENTS.contains(&name) {
            self.pos = self.skip_element(name);
        }
    }

    fn handle_close(&mut self, name: &str) {
        let Some(element) = AllowedElement::from_tag(name) else {
            return;
        };
        if let Some(depth) = self.open.iter().rposition(|open| *open == element) {
            while self.open.len() > depth {
                if let Some(open) = self.open.pop() {
                    self.close(open);
                }
            }
        }
    }

    fn emit_open(&mut self, element: AllowedElement, attributes: &str) {
        self.out.push('<');
        self.out.push_str(element.tag());

        let mut seen: Vec<String> = Vec::new();
        for caps in ATTRIBUTE_RE.captures_iter(attributes) {
            let name = caps[1].to_ascii_lowercase();
            if seen.contains(&name) {
                continue;
            }
            seen.push(name.clone());

            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str());
            match (element.attribute(&name), value) {
                (Some(kind), Some(value)) if kind.accepts(value) => {
                    self.out.push(' ');
                    self.out.push_str(&name);
                    self.out.push_str("=\"");
                    self.out.push_str(value);
                    self.out.push('"');
                }
                _ => tracing::debug!(
                    element = element.tag(),
                    attribute = %name,
                    "dropped disallowed attribute"
                ),
            }
        }
        self.out.push('>');
    }

    fn close(&mut self, element: AllowedElement) {
        self.out.push_str("</");
        self.out.push_str(element.tag());
        self.out.push('>');
    }

    /// Position just past the close tag of a raw-text element, or end of input.
    fn skip_raw_text(&self, name: &str) -> usize {
        let close = format!("</{name}");
        match self.lower[self.pos..].find(&close) {
            Some(offset) => {
                let after = self.pos + offset + close.len();
                match self.lower[after..].find('>') {
                    Some(gt) => after + gt + 1,
                    None => self.input.len(),
                }
            }
            None => self.input.len(),
        }
    }

    /// Position just past the close tag matching an already-consumed open tag
    /// of `name`, counting nested elements of the same name. Runs to the end
    /// of input when unmatched.
    fn skip_element(&self, name: &str) -> usize {
        let mut depth = 1usize;
        let mut pos = self.pos;
        while let Some(offset) = self.lower[pos..].find('<') {
            let lt = pos + offset;
            let rest = &self.lower[lt..];
            if rest.starts_with("<!--") {
                match rest.find("-->") {
                    Some(end) => {
                        pos = lt + end + 3;
                        continue;
                    }
                    None => break,
                }
            }

            let (closing, name_start) = if rest.starts_with("</") {
                (true, lt + 2)
            } else {
                (false, lt + 1)
            };
            let Some(tag_end) = find_tag_end(self.input, name_start) else {
                pos = lt + 1;
                continue;
            };
            if tag_name_is(&self.lower[name_start..], name) {
                if closing {
                    depth -= 1;
                    if depth == 0 {
                        return tag_end + 1;
                    }
                } else if !self.input[name_start..tag_end].trim_end().ends_with('/') {
                    depth += 1;
                }
            }
            pos = tag_end + 1;
        }
        self.input.len()
    }
}

/// Does `text` start with tag name `name` followed by a non-name character?
pub(crate) fn tag_name_is(text: &str, name: &str) -> bool {
    text.starts_with(name)
        && !text[name.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Index of the `>` closing a tag, skipping quoted attribute values.
pub(crate) fn find_tag_end(input: &str, from: usize) -> Option<usize> {
    let mut quote = None;
    for (offset, c) in input[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(from + offset),
            (None, _) => {}
        }
    }
    None
}

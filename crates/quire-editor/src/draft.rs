//! Working state of the math and table insertion dialogs.
//!
//! A draft exists while its dialog is open. Confirming consumes it into a
//! fragment; cancelling is just dropping it, so there is no partial commit.

use pulldown_cmark_escape::escape_html;
use quire_content::{GridTable, convert};

/// Math expression being composed in the insertion dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MathDraft {
    raw_notation: String,
    preview: String,
}

impl MathDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the notation and recompute the preview.
    pub fn set_notation(&mut self, notation: impl Into<String>) {
        self.raw_notation = notation.into();
        self.preview = convert(&self.raw_notation);
    }

    pub fn raw_notation(&self) -> &str {
        &self.raw_notation
    }

    /// Symbolic form of the current notation.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn is_empty(&self) -> bool {
        self.raw_notation.trim().is_empty()
    }

    /// The text to insert: math is stored as plain Unicode, not markup.
    pub fn into_fragment(self) -> String {
        self.preview
    }
}

/// Table being laid out in the insertion dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDraft {
    table: GridTable,
}

impl TableDraft {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            table: GridTable::new(rows, cols),
        }
    }

    pub fn table(&self) -> &GridTable {
        &self.table
    }

    /// Change dimensions, keeping cells that still fit.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.table = std::mem::take(&mut self.table).resize(rows, cols);
    }

    pub fn set_cell(&mut self, row: usize, col: usize, content: impl Into<String>) {
        self.table.set_cell(row, col, content);
    }

    pub fn set_header_row(&mut self, has_header_row: bool) {
        self.table.set_header_row(has_header_row);
    }

    pub fn plain_text_preview(&self) -> String {
        self.table.to_plain_text_preview()
    }

    /// Build the table fragment, escaping cell text first when asked to.
    pub fn into_fragment(self, escape_cells: bool) -> String {
        let mut table = self.table;
        if escape_cells {
            for row in 0..table.rows() {
                for col in 0..table.cols() {
                    let mut escaped = String::new();
                    // Writing to a String can't fail.
                    let _ = escape_html(&mut escaped, table.cell(row, col).unwrap_or_default());
                    table.set_cell(row, col, escaped);
                }
            }
        }
        table.to_markup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_preview_tracks_every_edit() {
        let mut draft = MathDraft::new();
        assert!(draft.is_empty());

        draft.set_notation(r"\pi");
        assert_eq!(draft.preview(), "π");
        draft.set_notation(r"\pi r^{2}");
        assert_eq!(draft.preview(), "π r²");
        assert_eq!(draft.raw_notation(), r"\pi r^{2}");
        assert_eq!(draft.into_fragment(), "π r²");
    }

    #[test]
    fn table_resize_keeps_entered_cells() {
        let mut draft = TableDraft::new(2, 2);
        draft.set_cell(0, 0, "A");
        draft.set_cell(1, 1, "D");
        draft.resize(3, 3);
        draft.set_cell(2, 2, "I");
        draft.resize(2, 2);

        assert_eq!(draft.table().cell(0, 0), Some("A"));
        assert_eq!(draft.table().cell(1, 1), Some("D"));
        assert_eq!(draft.table().cell(2, 2), None);
    }

    #[test]
    fn table_cells_are_escaped() {
        let mut draft = TableDraft::new(1, 1);
        draft.set_header_row(false);
        draft.set_cell(0, 0, "a<b & c");
        let fragment = draft.clone().into_fragment(true);
        assert!(fragment.contains(">a&lt;b &amp; c</td>"));

        let raw = draft.into_fragment(false);
        assert!(raw.contains(">a<b & c</td>"));
    }
}

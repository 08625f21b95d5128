//! Grid table model and its markup / plain-text builders.
//!
//! A [`GridTable`] lives only while a table-insertion dialog is open. Once the
//! author confirms, it is turned into markup with [`GridTable::to_markup`] and
//! thrown away; only the markup is ever stored.

use std::fmt::Write;

/// Inline style on the `<table>` element.
pub const TABLE_STYLE: &str = "border-collapse: collapse; margin: 4px 0;";
/// Inline style on body cells.
pub const CELL_STYLE: &str = "border: 1px solid #d1d5db; padding: 4px 8px;";
/// Inline style on header cells.
pub const HEADER_CELL_STYLE: &str =
    "border: 1px solid #d1d5db; padding: 4px 8px; background: #f3f4f6; font-weight: 600;";

/// Editable rows × cols matrix of cell text, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTable {
    rows: usize,
    cols: usize,
    cells: Vec<Vec<String>>,
    has_header_row: bool,
}

impl Default for GridTable {
    fn default() -> Self {
        Self::new(2, 2)
    }
}

impl GridTable {
    /// Create an empty table. Dimensions are clamped to at least 1×1.
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            cells: vec![vec![String::new(); cols]; rows],
            has_header_row: true,
        }
    }

    /// Build a table from row-major cell values; missing cells are left empty.
    pub fn from_cells<I, S>(rows: usize, cols: usize, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(rows, cols);
        let cols = table.cols;
        for (index, content) in cells.into_iter().take(table.rows * cols).enumerate() {
            table.cells[index / cols][index % cols] = content.into();
        }
        table
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn has_header_row(&self) -> bool {
        self.has_header_row
    }

    pub fn set_header_row(&mut self, has_header_row: bool) {
        self.has_header_row = has_header_row;
    }

    /// Builder-style variant of [`GridTable::set_header_row`].
    pub fn with_header_row(mut self, has_header_row: bool) -> Self {
        self.has_header_row = has_header_row;
        self
    }

    /// Cell content, or `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(String::as_str)
    }

    /// Replace a cell's content.
    ///
    /// # Panics
    ///
    /// Panics if `(row, col)` is outside the current dimensions. Callers
    /// always derive coordinates from [`rows`](Self::rows) and
    /// [`cols`](Self::cols), so a miss here is a bug.
    pub fn set_cell(&mut self, row: usize, col: usize, content: impl Into<String>) {
        assert!(
            row < self.rows && col < self.cols,
            "cell ({row}, {col}) out of range for {}x{} table",
            self.rows,
            self.cols
        );
        self.cells[row][col] = content.into();
    }

    /// Rebuild the matrix at new dimensions, keeping every cell that still fits.
    ///
    /// New cells are empty. Dimensions are clamped to at least 1×1.
    pub fn resize(self, rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let mut old_rows = self.cells.into_iter();
        let cells = (0..rows)
            .map(|_| {
                let mut row = old_rows.next().unwrap_or_default();
                row.resize(cols, String::new());
                row
            })
            .collect();
        Self {
            rows,
            cols,
            cells,
            has_header_row: self.has_header_row,
        }
    }

    /// Emit the table fragment.
    ///
    /// Cell content is written verbatim; escaping is the caller's job. The
    /// output only uses elements and attributes the sanitizer keeps, so
    /// sanitizing it again is a no-op.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        // Writing to a String can't fail.
        let _ = write!(out, r#"<table style="{TABLE_STYLE}">"#);
        for (index, row) in self.cells.iter().enumerate() {
            let (tag, style) = if index == 0 && self.has_header_row {
                ("th", HEADER_CELL_STYLE)
            } else {
                ("td", CELL_STYLE)
            };
            out.push_str("<tr>");
            for cell in row {
                let _ = write!(out, r#"<{tag} style="{style}">{cell}</{tag}>"#);
            }
            out.push_str("</tr>");
        }
        out.push_str("</table>");
        out
    }

    /// Column-aligned, pipe-delimited text rendering.
    ///
    /// With a header row, a `|---|` separator line follows the first row.
    pub fn to_plain_text_preview(&self) -> String {
        let widths: Vec<usize> = (0..self.cols)
            .map(|col| {
                self.cells
                    .iter()
                    .map(|row| row[col].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows + 1);
        for (index, row) in self.cells.iter().enumerate() {
            let mut line = String::from("|");
            for (cell, width) in row.iter().zip(&widths) {
                let pad = width - cell.chars().count();
                let _ = write!(line, " {cell}{} |", " ".repeat(pad));
            }
            lines.push(line);

            if index == 0 && self.has_header_row {
                let mut separator = String::from("|");
                for width in &widths {
                    separator.push_str(&"-".repeat(width + 2));
                    separator.push('|');
                }
                lines.push(separator);
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> GridTable {
        GridTable::from_cells(2, 2, ["A", "B", "C", "D"])
    }

    #[test]
    fn header_row_markup() {
        let markup = abcd().to_markup();
        assert_eq!(markup.matches("<tr>").count(), 2);
        assert_eq!(markup.matches("<th ").count(), 2);
        assert_eq!(markup.matches("<td ").count(), 2);

        let (header, body) = markup.split_once("</tr>").unwrap();
        assert!(header.contains(">A</th>") && header.contains(">B</th>"));
        assert!(body.contains(">C</td>") && body.contains(">D</td>"));
        assert!(!body.contains("<th"));
    }

    #[test]
    fn markup_without_header_uses_plain_cells() {
        let markup = abcd().with_header_row(false).to_markup();
        assert!(!markup.contains("<th"));
        assert_eq!(markup.matches("<td ").count(), 4);
    }

    #[test]
    fn exact_markup_for_single_cell() {
        let table = GridTable::from_cells(1, 1, ["x"]).with_header_row(false);
        insta::assert_snapshot!(
            table.to_markup(),
            @r#"<table style="border-collapse: collapse; margin: 4px 0;"><tr><td style="border: 1px solid #d1d5db; padding: 4px 8px;">x</td></tr></table>"#
        );
    }

    #[test]
    fn plain_text_preview_with_header() {
        let preview = abcd().to_plain_text_preview();
        assert_eq!(preview, "| A | B |\n|---|---|\n| C | D |");
    }

    #[test]
    fn plain_text_preview_aligns_columns() {
        let table = GridTable::from_cells(2, 2, ["Name", "Age", "Bo", "7"]).with_header_row(false);
        assert_eq!(table.to_plain_text_preview(), "| Name | Age |\n| Bo   | 7   |");
    }

    #[test]
    fn builders_are_deterministic() {
        let table = abcd();
        assert_eq!(table.to_markup(), table.to_markup());
        assert_eq!(table.to_plain_text_preview(), table.to_plain_text_preview());
    }

    #[test]
    fn resize_round_trip_preserves_overlap() {
        let mut table = GridTable::new(3, 4);
        for row in 0..3 {
            for col in 0..4 {
                table.set_cell(row, col, format!("{row}:{col}"));
            }
        }

        let back = table.clone().resize(2, 6).resize(3, 4);
        for row in 0..3 {
            for col in 0..4 {
                let expected = if row < 2 { format!("{row}:{col}") } else { String::new() };
                assert_eq!(back.cell(row, col), Some(expected.as_str()));
            }
        }
        assert_eq!(back.rows(), 3);
        assert_eq!(back.cols(), 4);
    }

    #[test]
    fn resize_clamps_to_one_by_one() {
        let table = abcd().resize(0, 0);
        assert_eq!((table.rows(), table.cols()), (1, 1));
        assert_eq!(table.cell(0, 0), Some("A"));
        assert_eq!(table.cell(0, 1), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn set_cell_out_of_range_panics() {
        abcd().set_cell(2, 0, "nope");
    }
}

// ============================================================
// TABULAR ROW TYPES
// ============================================================
// Format-neutral rows shared by every spreadsheet reader and writer

use serde::{Deserialize, Serialize};

/// One cell: absent, or its text. Scalars are stringified by the reader.
pub type Cell = Option<String>;

/// A single sheet row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// 1-based row number as shown by spreadsheet software
    pub number: usize,

    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(number: usize, cells: Vec<Cell>) -> Self {
        Self { number, cells }
    }

    /// Build a row from plain strings; empty strings become absent cells and
    /// trailing absent cells are dropped.
    pub fn from_texts<S: AsRef<str>>(number: usize, texts: &[S]) -> Self {
        let mut cells: Vec<Cell> = texts
            .iter()
            .map(|text| {
                let text = text.as_ref();
                if text.is_empty() {
                    None
                } else {
                    Some(text.to_string())
                }
            })
            .collect();
        trim_trailing_absent(&mut cells);
        Self { number, cells }
    }

    /// Cell text at `column`; short rows read as absent.
    pub fn cell(&self, column: usize) -> Option<&str> {
        self.cells.get(column).and_then(|cell| cell.as_deref())
    }

    /// Trimmed cell text, `None` when absent or whitespace only.
    pub fn trimmed(&self, column: usize) -> Option<&str> {
        self.cell(column)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn is_blank(&self) -> bool {
        self.is_blank_within(self.cells.len())
    }

    /// Blank across the first `width` columns; anything further right is ignored.
    pub fn is_blank_within(&self, width: usize) -> bool {
        (0..width).all(|column| self.trimmed(column).is_none())
    }
}

/// Drops trailing absent cells so ragged rows compare equal across formats.
pub fn trim_trailing_absent(cells: &mut Vec<Cell>) {
    while matches!(cells.last(), Some(None)) {
        cells.pop();
    }
}

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::{TabularParser, TabularWriter};
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::trim_trailing_absent;
use crate::domain::{Cell, Row};

/// Excel sheet names are capped at 31 characters.
const MAX_SHEET_NAME_LENGTH: usize = 31;

/// Workbook reader (xlsx, ods, xls via calamine) and xlsx writer.
pub struct WorkbookCodec {
    column_width: f64,
}

impl Default for WorkbookCodec {
    fn default() -> Self {
        Self { column_width: 32.0 }
    }
}

impl WorkbookCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TabularParser for WorkbookCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Row>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| AppError::FormatError(format!("Failed to open workbook: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::FormatError("Workbook has no worksheets".to_string()))?
            .map_err(|e| AppError::FormatError(format!("Failed to read worksheet: {}", e)))?;

        // calamine trims leading empty rows/columns from the range; put them
        // back so column A stays index 0 and row numbers match the sheet.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        let rows = range
            .rows()
            .enumerate()
            .map(|(offset, cells)| {
                let mut row_cells: Vec<Cell> = vec![None; start_col as usize];
                row_cells.extend(cells.iter().map(cell_text));
                trim_trailing_absent(&mut row_cells);
                Row::new(start_row as usize + offset + 1, row_cells)
            })
            .collect::<Vec<_>>();

        tracing::debug!(rows = rows.len(), "Workbook decoded");
        Ok(rows)
    }
}

fn cell_text(cell: &Data) -> Cell {
    match cell {
        Data::Empty => None,
        Data::String(text) if text.is_empty() => None,
        Data::String(text) => Some(text.clone()),
        // Integral floats come from typed numbers like a year; print them bare.
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1.0e15 => {
            Some(format!("{}", *value as i64))
        }
        Data::Error(err) => {
            tracing::debug!(error = ?err, "Treating formula error cell as blank");
            None
        }
        other => Some(other.to_string()),
    }
}

impl TabularWriter for WorkbookCodec {
    fn write(&self, sheet_name: &str, rows: &[Row]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let sheet_name: String = sheet_name.chars().take(MAX_SHEET_NAME_LENGTH).collect();

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name(sheet_name).map_err(xlsx_error)?;

            let width = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
            for column in 0..width {
                sheet
                    .set_column_width(column as u16, self.column_width)
                    .map_err(xlsx_error)?;
            }

            for (row_index, row) in rows.iter().enumerate() {
                for (column, cell) in row.cells.iter().enumerate() {
                    let Some(text) = cell else { continue };
                    if row_index == 0 {
                        sheet
                            .write_string_with_format(
                                row_index as u32,
                                column as u16,
                                text,
                                &header_format,
                            )
                            .map_err(xlsx_error)?;
                    } else {
                        sheet
                            .write_string(row_index as u32, column as u16, text)
                            .map_err(xlsx_error)?;
                    }
                }
            }

            if !rows.is_empty() {
                sheet.set_freeze_panes(1, 0).map_err(xlsx_error)?;
            }
        }

        workbook.save_to_buffer().map_err(xlsx_error)
    }
}

fn xlsx_error(err: XlsxError) -> AppError {
    AppError::Internal(format!("Failed to write xlsx: {}", err))
}

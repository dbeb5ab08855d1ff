// ============================================================
// CSV CODEC
// ============================================================
// CSV upload decoding with encoding detection, and CSV template output

use csv::{ReaderBuilder, WriterBuilder};
use encoding_rs::{Encoding, WINDOWS_1252};

use super::{TabularParser, TabularWriter};
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::trim_trailing_absent;
use crate::domain::{Cell, Row};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct CsvCodec {
    /// Delimiter character (default: comma)
    delimiter: u8,

    /// Prefix output with a UTF-8 BOM so Excel picks the right encoding
    write_bom: bool,
}

impl Default for CsvCodec {
    fn default() -> Self {
        Self {
            delimiter: b',',
            write_bom: true,
        }
    }
}

impl CsvCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// BOM first, then strict UTF-8, then Windows-1252 (what Excel on
    /// Windows writes for "CSV" without "UTF-8").
    fn decode_text(&self, bytes: &[u8]) -> Result<String> {
        if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
            let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
            return Ok(text.into_owned());
        }

        if bytes.contains(&0) {
            return Err(AppError::FormatError(
                "File is binary and not a recognised spreadsheet".to_string(),
            ));
        }

        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(_) => {
                tracing::debug!("Upload is not UTF-8, decoding as Windows-1252");
                let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
                Ok(text.into_owned())
            }
        }
    }
}

impl TabularParser for CsvCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Row>> {
        let content = self.decode_text(bytes)?;

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| {
                AppError::FormatError(format!("Failed to parse CSV row {}: {}", rows.len() + 1, e))
            })?;

            // Multi-line quoted fields make the record's own line the truth.
            let number = record
                .position()
                .map(|position| position.line() as usize)
                .unwrap_or(rows.len() + 1);

            let mut cells: Vec<Cell> = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect();
            trim_trailing_absent(&mut cells);
            rows.push(Row::new(number, cells));
        }

        Ok(rows)
    }
}

impl TabularWriter for CsvCodec {
    fn write(&self, _sheet_name: &str, rows: &[Row]) -> Result<Vec<u8>> {
        let buffer = if self.write_bom {
            UTF8_BOM.to_vec()
        } else {
            Vec::new()
        };

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(buffer);

        for row in rows {
            writer
                .write_record(row.cells.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
        }

        writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))
    }
}

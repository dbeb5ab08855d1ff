// ============================================================
// TABULAR INFRASTRUCTURE LAYER
// ============================================================
// Spreadsheet decoding / encoding behind format-neutral traits

mod csv_codec;
mod workbook_codec;

use std::fmt;
use std::str::FromStr;

use crate::domain::error::{AppError, Result};
use crate::domain::Row;

pub use csv_codec::CsvCodec;
pub use workbook_codec::WorkbookCodec;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

pub trait TabularParser: Send + Sync {
    /// Decode one sheet. Fails with `AppError::FormatError` only.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Row>>;
}

pub trait TabularWriter: Send + Sync {
    fn write(&self, sheet_name: &str, rows: &[Row]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    /// XLSX on write; XLSX, ODS or legacy XLS on read
    Xlsx,
    Csv,
}

impl TabularFormat {
    /// Picks a decoder from the payload's magic bytes.
    pub fn sniff(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(AppError::FormatError("upload is empty".to_string()));
        }
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE2_MAGIC) {
            return Ok(TabularFormat::Xlsx);
        }
        Ok(TabularFormat::Csv)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TabularFormat::Xlsx => "xlsx",
            TabularFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TabularFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            TabularFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn parser(&self) -> Box<dyn TabularParser> {
        match self {
            TabularFormat::Xlsx => Box::new(WorkbookCodec::new()),
            TabularFormat::Csv => Box::new(CsvCodec::new()),
        }
    }

    pub fn writer(&self) -> Box<dyn TabularWriter> {
        match self {
            TabularFormat::Xlsx => Box::new(WorkbookCodec::new()),
            TabularFormat::Csv => Box::new(CsvCodec::new()),
        }
    }
}

impl fmt::Display for TabularFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TabularFormat {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(TabularFormat::Xlsx),
            "csv" => Ok(TabularFormat::Csv),
            other => Err(AppError::ValidationError(format!(
                "Unsupported export format '{}', expected xlsx or csv",
                other
            ))),
        }
    }
}

/// Sniff and decode an uploaded spreadsheet.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<Row>> {
    let format = TabularFormat::sniff(bytes)?;
    tracing::debug!(format = %format, bytes = bytes.len(), "Decoding upload");
    format.parser().parse(bytes)
}

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ParseError(String),
    /// The upload could not be decoded as tabular data at all.
    FormatError(String),
    /// A uniqueness rule was violated (slug collision, duplicate subcategory).
    Conflict(String),
    /// The store rejected one call but is otherwise healthy.
    StoreError(String),
    /// The store cannot be reached; the whole operation must fail.
    StoreUnavailable(String),
    DatabaseError(String),
    IoError(String),
    ConfigError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::FormatError(msg) => write!(f, "Unreadable file: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::StoreError(msg) => write!(f, "Store error: {}", msg),
            AppError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Store-side rejections that only affect the row being written.
    pub fn is_row_scoped(&self) -> bool {
        matches!(
            self,
            AppError::Conflict(_)
                | AppError::StoreError(_)
                | AppError::ValidationError(_)
                | AppError::NotFound(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

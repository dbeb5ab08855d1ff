use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

pub const MAX_NAME_LENGTH: usize = 120;
pub const MAX_SUBCATEGORY_LENGTH: usize = 120;

/// A normalized row, ready for reconciliation. This is also the wire shape the
/// admin UI posts to the import endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntity {
    /// 1-based source row; 0 when the caller did not supply one
    #[serde(default)]
    pub row: usize,
    #[validate(length(max = 120))]
    pub name: String,
    /// Raw icon key as typed; `None` means "keep / default"
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<String>,
    /// Informational only; reconciliation always re-derives it from `name`
    #[serde(default)]
    pub slug: String,
}

/// One row that could not be imported. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RowError {
    pub fn new(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            reason: reason.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "Row {}: {} ({:?})", self.row, self.reason, value),
            None => write!(f, "Row {}: {}", self.row, self.reason),
        }
    }
}

/// What the caller gets back from every import that got past parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!(
            "Import finished: {} created, {} updated, {} skipped, {} errors",
            self.created,
            self.updated,
            self.skipped,
            self.errors.len()
        )
    }
}

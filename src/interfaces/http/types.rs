use serde::{Deserialize, Serialize};

use crate::domain::{CandidateEntity, ImportReport};

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub entities: Vec<CandidateEntity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ImportReport>,
}

impl ImportResponse {
    pub fn completed(report: ImportReport) -> Self {
        Self {
            success: true,
            message: report.summary(),
            results: Some(report),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaxonRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IconRequest {
    pub icon: String,
}

#[derive(Debug, Deserialize)]
pub struct SubcategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SubcategoryQuery {
    pub name: String,
}

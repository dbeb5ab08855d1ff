pub mod use_cases;

pub use use_cases::import_reporter::build_report;
pub use use_cases::reconciler::{reconcile, ReconcileResult};
pub use use_cases::row_normalizer::{normalize_rows, ColumnSchema};
pub use use_cases::slug::derive_slug;
pub use use_cases::taxonomy_service::{ExportedFile, TaxonomyUseCase};
pub use use_cases::template_exporter::export_rows;

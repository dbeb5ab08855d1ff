pub mod import_reporter;
pub mod reconciler;
pub mod row_normalizer;
pub mod slug;
pub mod taxonomy_service;
pub mod template_exporter;

pub mod app_config;
pub mod error;
pub mod import;
pub mod tabular;
pub mod taxon;

pub use app_config::AppConfig;
pub use error::{AppError, Result};
pub use import::{CandidateEntity, ImportReport, RowError};
pub use tabular::{Cell, Row};
pub use taxon::{Flavor, Icon, NewTaxon, Taxon, TaxonId, TaxonPatch, TaxonomyKind};

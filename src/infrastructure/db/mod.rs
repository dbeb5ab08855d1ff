pub mod memory;
pub mod taxonomy;

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::{NewTaxon, Taxon, TaxonId, TaxonPatch, TaxonomyKind};

pub use memory::InMemoryTaxonomyStore;
pub use taxonomy::SqliteTaxonomyStore;

/// Persistence seam for every taxonomy kind.
///
/// Implementations enforce `(kind, slug)` uniqueness themselves and report a
/// violation as `AppError::Conflict`. Transient per-call failures are
/// `AppError::StoreError`; a store that cannot be reached at all answers
/// `AppError::StoreUnavailable`.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<Taxon>>;
    async fn find_by_id(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<Option<Taxon>>;
    async fn find_by_slug(&self, kind: TaxonomyKind, slug: &str) -> Result<Option<Taxon>>;
    async fn create(&self, kind: TaxonomyKind, taxon: NewTaxon) -> Result<Taxon>;
    /// Mutates in place; the id never changes.
    async fn update(&self, kind: TaxonomyKind, id: &TaxonId, patch: &TaxonPatch) -> Result<Taxon>;
    async fn delete(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<()>;
}

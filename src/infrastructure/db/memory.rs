use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::TaxonomyStore;
use crate::domain::error::{AppError, Result};
use crate::domain::{NewTaxon, Taxon, TaxonId, TaxonPatch, TaxonomyKind};

/// Process-local store. Backs `database.url = "memory"` and the test suites.
#[derive(Default)]
pub struct InMemoryTaxonomyStore {
    taxa: Mutex<HashMap<TaxonomyKind, Vec<Taxon>>>,
}

impl InMemoryTaxonomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<TaxonomyKind, Vec<Taxon>>>> {
        self.taxa
            .lock()
            .map_err(|_| AppError::StoreUnavailable("In-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TaxonomyStore for InMemoryTaxonomyStore {
    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<Taxon>> {
        Ok(self.lock()?.get(&kind).cloned().unwrap_or_default())
    }

    async fn find_by_id(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<Option<Taxon>> {
        Ok(self
            .lock()?
            .get(&kind)
            .and_then(|taxa| taxa.iter().find(|t| &t.id == id).cloned()))
    }

    async fn find_by_slug(&self, kind: TaxonomyKind, slug: &str) -> Result<Option<Taxon>> {
        Ok(self
            .lock()?
            .get(&kind)
            .and_then(|taxa| taxa.iter().find(|t| t.slug == slug).cloned()))
    }

    async fn create(&self, kind: TaxonomyKind, taxon: NewTaxon) -> Result<Taxon> {
        let mut guard = self.lock()?;
        let taxa = guard.entry(kind).or_default();
        if taxa.iter().any(|t| t.slug == taxon.slug) {
            return Err(AppError::Conflict(format!(
                "slug '{}' already exists in {}",
                taxon.slug, kind
            )));
        }

        let now = chrono::Utc::now();
        let created = Taxon {
            id: TaxonId::new_v4(),
            kind,
            name: taxon.name,
            slug: taxon.slug,
            icon: taxon.icon,
            subcategories: taxon.subcategories,
            created_at: now,
            updated_at: now,
        };
        taxa.push(created.clone());
        Ok(created)
    }

    async fn update(&self, kind: TaxonomyKind, id: &TaxonId, patch: &TaxonPatch) -> Result<Taxon> {
        let mut guard = self.lock()?;
        let taxon = guard
            .get_mut(&kind)
            .and_then(|taxa| taxa.iter_mut().find(|t| &t.id == id))
            .ok_or_else(|| AppError::NotFound(format!("{} entry {}", kind, id)))?;

        patch.apply_to(taxon);
        taxon.updated_at = chrono::Utc::now();
        Ok(taxon.clone())
    }

    async fn delete(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<()> {
        let mut guard = self.lock()?;
        let taxa = guard.entry(kind).or_default();
        let before = taxa.len();
        taxa.retain(|t| &t.id != id);
        if taxa.len() == before {
            return Err(AppError::NotFound(format!("{} entry {}", kind, id)));
        }
        Ok(())
    }
}

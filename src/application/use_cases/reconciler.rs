// ============================================================
// RECONCILER
// ============================================================
// Decides create / update / skip for each candidate against a live view of
// the store snapshot plus everything planned earlier in the same batch.
// Pure: no I/O, no async.

use std::collections::{HashMap, HashSet};

use validator::Validate;

use crate::application::use_cases::row_normalizer::split_subcategories;
use crate::application::use_cases::slug::{derive_slug, subcategory_key};
use crate::domain::import::{MAX_NAME_LENGTH, MAX_SUBCATEGORY_LENGTH};
use crate::domain::{
    CandidateEntity, Flavor, Icon, NewTaxon, RowError, Taxon, TaxonId, TaxonPatch,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCreate {
    /// Source rows folded into this taxon; the first one created it
    pub rows: Vec<usize>,
    pub taxon: NewTaxon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub rows: Vec<usize>,
    pub id: TaxonId,
    pub name: String,
    pub patch: TaxonPatch,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileResult {
    pub to_create: Vec<PlannedCreate>,
    pub to_update: Vec<PlannedUpdate>,
    /// Rows that matched something and changed nothing
    pub skipped: Vec<usize>,
    pub errors: Vec<RowError>,
    pub warnings: Vec<String>,
}

/// A candidate that passed validation.
#[derive(Debug, Clone)]
struct Admitted {
    name: String,
    slug: String,
    icon: Option<Icon>,
    subcategories: Vec<String>,
}

#[derive(Debug, Clone)]
enum Origin {
    Existing {
        id: TaxonId,
        original_icon: Option<Icon>,
        original_subcategories: Vec<String>,
    },
    Planned,
}

/// Current state of one taxon inside the batch view.
#[derive(Debug, Clone)]
struct Draft {
    origin: Origin,
    name: String,
    slug: String,
    icon: Option<Icon>,
    subcategories: Vec<String>,
    subcategory_keys: HashSet<String>,
    rows: Vec<usize>,
}

impl Draft {
    fn from_existing(taxon: &Taxon) -> Self {
        Self {
            origin: Origin::Existing {
                id: taxon.id.clone(),
                original_icon: taxon.icon,
                original_subcategories: taxon.subcategories.clone(),
            },
            name: taxon.name.clone(),
            slug: taxon.slug.clone(),
            icon: taxon.icon,
            subcategory_keys: taxon
                .subcategories
                .iter()
                .map(|s| subcategory_key(s))
                .collect(),
            subcategories: taxon.subcategories.clone(),
            rows: Vec::new(),
        }
    }

    fn planned(row: usize, admitted: Admitted, flavor: Flavor) -> Self {
        let icon = if flavor.is_hierarchical() {
            Some(admitted.icon.unwrap_or_default())
        } else {
            None
        };
        let mut draft = Self {
            origin: Origin::Planned,
            name: admitted.name,
            slug: admitted.slug,
            icon,
            subcategories: Vec::new(),
            subcategory_keys: HashSet::new(),
            rows: vec![row],
        };
        draft.union_subcategories(&admitted.subcategories);
        draft
    }

    /// Appends unseen subcategories in candidate order. Returns how many were added.
    fn union_subcategories(&mut self, incoming: &[String]) -> usize {
        let mut added = 0;
        for subcategory in incoming {
            if self.subcategory_keys.insert(subcategory_key(subcategory)) {
                self.subcategories.push(subcategory.trim().to_string());
                added += 1;
            }
        }
        added
    }

    /// Folds a matching candidate in. Returns whether anything changed.
    fn merge(&mut self, admitted: &Admitted, flavor: Flavor) -> bool {
        if !flavor.is_hierarchical() {
            return false;
        }

        let mut changed = false;
        // A missing or unrecognised stored icon already reads as Tag.
        if let Some(icon) = admitted.icon {
            if self.icon.unwrap_or_default() != icon {
                self.icon = Some(icon);
                changed = true;
            }
        }
        if self.union_subcategories(&admitted.subcategories) > 0 {
            changed = true;
        }
        changed
    }

    /// Net change against the stored taxon, if this draft came from the store.
    fn patch(&self) -> Option<(TaxonId, TaxonPatch)> {
        let Origin::Existing {
            id,
            original_icon,
            original_subcategories,
        } = &self.origin
        else {
            return None;
        };

        let patch = TaxonPatch {
            icon: self
                .icon
                .filter(|icon| *icon != original_icon.unwrap_or_default()),
            subcategories: (self.subcategories != *original_subcategories)
                .then(|| self.subcategories.clone()),
        };
        Some((id.clone(), patch))
    }
}

/// Batch-local view: store snapshot plus pending creations, indexed by slug.
struct ReconcileView {
    flavor: Flavor,
    drafts: Vec<Draft>,
    by_slug: HashMap<String, usize>,
    /// Drafts in the order they were first changed
    touched: Vec<usize>,
}

impl ReconcileView {
    fn new(flavor: Flavor, existing: &[Taxon], warnings: &mut Vec<String>) -> Self {
        let mut view = Self {
            flavor,
            drafts: Vec::with_capacity(existing.len()),
            by_slug: HashMap::with_capacity(existing.len()),
            touched: Vec::new(),
        };

        for taxon in existing {
            // Match on the recomputed slug so legacy rows with stale slugs still collide.
            let key = derive_slug(&taxon.name);
            let key = if key.is_empty() { taxon.slug.clone() } else { key };
            if view.by_slug.contains_key(&key) {
                tracing::warn!(slug = %key, id = %taxon.id, "Store holds duplicate slug");
                warnings.push(format!(
                    "Existing taxon '{}' shares slug '{}' with another entry; only the first is matched",
                    taxon.name, key
                ));
                continue;
            }
            view.by_slug.insert(key, view.drafts.len());
            view.drafts.push(Draft::from_existing(taxon));
        }

        // The stored slug is an alias, so a candidate carrying it merges
        // instead of colliding with the unique constraint on create.
        for (index, draft) in view.drafts.iter().enumerate() {
            view.by_slug.entry(draft.slug.clone()).or_insert(index);
        }
        view
    }

    fn apply(&mut self, row: usize, admitted: Admitted, result: &mut ReconcileResult) {
        match self.by_slug.get(&admitted.slug).copied() {
            None => {
                tracing::debug!(row, slug = %admitted.slug, "Planning create");
                let index = self.drafts.len();
                self.by_slug.insert(admitted.slug.clone(), index);
                self.drafts.push(Draft::planned(row, admitted, self.flavor));
                self.touched.push(index);
            }
            Some(index) => {
                let flavor = self.flavor;
                let draft = &mut self.drafts[index];
                if draft.merge(&admitted, flavor) {
                    tracing::debug!(row, slug = %draft.slug, "Merging into existing entry");
                    if draft.rows.is_empty() {
                        self.touched.push(index);
                    }
                    draft.rows.push(row);
                } else {
                    tracing::debug!(row, slug = %draft.slug, "Nothing to change");
                    result.skipped.push(row);
                }
            }
        }
    }

    fn finish(self, mut result: ReconcileResult) -> ReconcileResult {
        for index in self.touched {
            let draft = &self.drafts[index];
            match draft.patch() {
                None => result.to_create.push(PlannedCreate {
                    rows: draft.rows.clone(),
                    taxon: NewTaxon {
                        name: draft.name.clone(),
                        slug: draft.slug.clone(),
                        icon: draft.icon,
                        subcategories: draft.subcategories.clone(),
                    },
                }),
                // Later rows undid what earlier rows changed.
                Some((_, patch)) if patch.is_empty() => {
                    result.skipped.extend(draft.rows.iter().copied());
                }
                Some((id, patch)) => result.to_update.push(PlannedUpdate {
                    rows: draft.rows.clone(),
                    id,
                    name: draft.name.clone(),
                    patch,
                }),
            }
        }
        result.skipped.sort_unstable();
        result
    }
}

fn admit(
    flavor: Flavor,
    row: usize,
    candidate: &CandidateEntity,
    warnings: &mut Vec<String>,
) -> Result<Admitted, RowError> {
    let name = candidate.name.trim();
    if name.is_empty() {
        return Err(RowError::new(row, "empty name"));
    }
    if candidate.validate().is_err() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(RowError::new(
            row,
            format!("name exceeds {} characters", MAX_NAME_LENGTH),
        )
        .with_value(name));
    }

    let slug = derive_slug(name);
    if slug.is_empty() {
        return Err(RowError::new(row, "name produces an empty slug").with_value(name));
    }

    if !flavor.is_hierarchical() {
        return Ok(Admitted {
            name: name.to_string(),
            slug,
            icon: None,
            subcategories: Vec::new(),
        });
    }

    let icon = match candidate.icon.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let icon = Icon::from_key(raw);
            if icon.is_none() {
                warnings.push(format!(
                    "Row {}: unknown icon {:?}, keeping the current icon (new entries use Tag)",
                    row, raw
                ));
            }
            icon
        }
    };

    let subcategories: Vec<String> = candidate
        .subcategories
        .iter()
        .flat_map(|entry| split_subcategories(entry))
        .collect();
    if let Some(long) = subcategories
        .iter()
        .find(|s| s.chars().count() > MAX_SUBCATEGORY_LENGTH)
    {
        return Err(RowError::new(
            row,
            format!("subcategory exceeds {} characters", MAX_SUBCATEGORY_LENGTH),
        )
        .with_value(long.clone()));
    }

    Ok(Admitted {
        name: name.to_string(),
        slug,
        icon,
        subcategories,
    })
}

/// Plans the writes for one batch.
///
/// Candidates are processed strictly in order. Each one sees the effect of
/// all earlier candidates, so repeated slugs fold into a single create or a
/// single update instead of racing each other at the store.
pub fn reconcile(
    flavor: Flavor,
    existing: &[Taxon],
    candidates: &[CandidateEntity],
) -> ReconcileResult {
    let mut result = ReconcileResult::default();
    let mut view = ReconcileView::new(flavor, existing, &mut result.warnings);

    for (position, candidate) in candidates.iter().enumerate() {
        let row = if candidate.row == 0 {
            position + 1
        } else {
            candidate.row
        };

        match admit(flavor, row, candidate, &mut result.warnings) {
            Ok(admitted) => view.apply(row, admitted, &mut result),
            Err(error) => {
                tracing::warn!(row, reason = %error.reason, "Rejected import row");
                result.errors.push(error);
            }
        }
    }

    view.finish(result)
}

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::application::use_cases::import_reporter::{build_report, ApplyOutcome};
use crate::application::use_cases::reconciler::reconcile;
use crate::application::use_cases::row_normalizer::{normalize_rows, ColumnSchema};
use crate::application::use_cases::slug::{derive_slug, subcategory_key};
use crate::application::use_cases::template_exporter::export_rows;
use crate::domain::error::{AppError, Result};
use crate::domain::import::MAX_SUBCATEGORY_LENGTH;
use crate::domain::{
    CandidateEntity, Icon, ImportReport, NewTaxon, RowError, Taxon, TaxonId, TaxonPatch,
    TaxonomyKind,
};
use crate::infrastructure::db::TaxonomyStore;
use crate::infrastructure::tabular::{parse_upload, TabularFormat};

/// A rendered spreadsheet ready to hand to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct TaxonomyUseCase {
    store: Arc<dyn TaxonomyStore>,
}

impl TaxonomyUseCase {
    pub fn new(store: Arc<dyn TaxonomyStore>) -> Self {
        Self { store }
    }

    /// Decode an uploaded sheet and import it. An unreadable file fails
    /// before the store is touched.
    pub async fn import_upload(&self, kind: TaxonomyKind, bytes: &[u8]) -> Result<ImportReport> {
        let rows = parse_upload(bytes)?;
        let candidates = normalize_rows(&rows, &ColumnSchema::for_flavor(kind.flavor()));
        info!(
            kind = %kind,
            rows = rows.len(),
            candidates = candidates.len(),
            "Parsed taxonomy upload"
        );
        self.import_entities(kind, candidates).await
    }

    pub async fn import_entities(
        &self,
        kind: TaxonomyKind,
        candidates: Vec<CandidateEntity>,
    ) -> Result<ImportReport> {
        let existing = self.store.list(kind).await?;
        let plan = reconcile(kind.flavor(), &existing, &candidates);

        let mut outcome = ApplyOutcome::default();

        for create in &plan.to_create {
            match self.store.create(kind, create.taxon.clone()).await {
                Ok(taxon) => outcome.created.push(taxon),
                Err(e) if e.is_row_scoped() => {
                    warn!(kind = %kind, rows = ?create.rows, error = %e, "Store rejected planned create");
                    outcome
                        .failures
                        .extend(save_failures(&create.rows, &create.taxon.name, &e));
                }
                Err(e) => return Err(e),
            }
        }

        for update in &plan.to_update {
            match self.store.update(kind, &update.id, &update.patch).await {
                Ok(taxon) => outcome.updated.push(taxon),
                Err(e) if e.is_row_scoped() => {
                    warn!(kind = %kind, rows = ?update.rows, error = %e, "Store rejected planned update");
                    outcome
                        .failures
                        .extend(save_failures(&update.rows, &update.name, &e));
                }
                Err(e) => return Err(e),
            }
        }

        let report = build_report(&plan, &outcome);
        info!(
            kind = %kind,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "{}",
            report.summary()
        );
        Ok(report)
    }

    pub async fn export_template(
        &self,
        kind: TaxonomyKind,
        format: TabularFormat,
    ) -> Result<ExportedFile> {
        let taxa = self.store.list(kind).await?;
        let rows = export_rows(kind.flavor(), &taxa);
        let bytes = format.writer().write(kind.label(), &rows)?;

        info!(kind = %kind, format = %format, taxa = taxa.len(), "Exported taxonomy template");
        Ok(ExportedFile {
            file_name: format!("{}_template.{}", kind.as_str(), format.extension()),
            content_type: format.content_type(),
            bytes,
        })
    }

    pub async fn list(&self, kind: TaxonomyKind) -> Result<Vec<Taxon>> {
        self.store.list(kind).await
    }

    pub async fn create_one(
        &self,
        kind: TaxonomyKind,
        name: &str,
        icon: Option<&str>,
    ) -> Result<Taxon> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Name is required.".to_string()));
        }
        CandidateEntity {
            name: name.to_string(),
            ..Default::default()
        }
        .validate()
        .map_err(|e| AppError::ValidationError(format!("Invalid name: {}", e)))?;

        let slug = derive_slug(name);
        if slug.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Name '{}' has no letters or digits",
                name
            )));
        }

        let icon = if kind.flavor().is_hierarchical() {
            Some(match icon.map(str::trim).filter(|raw| !raw.is_empty()) {
                Some(raw) => parse_icon(raw)?,
                None => Icon::default(),
            })
        } else {
            None
        };

        if self.store.find_by_slug(kind, &slug).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "'{}' already exists in {}",
                name,
                kind.label()
            )));
        }

        let taxon = self
            .store
            .create(
                kind,
                NewTaxon {
                    name: name.to_string(),
                    slug,
                    icon,
                    subcategories: Vec::new(),
                },
            )
            .await?;
        info!(kind = %kind, id = %taxon.id, slug = %taxon.slug, "Created taxon");
        Ok(taxon)
    }

    pub async fn delete_one(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<()> {
        self.store.delete(kind, id).await?;
        info!(kind = %kind, id = %id, "Deleted taxon");
        Ok(())
    }

    pub async fn update_icon(&self, kind: TaxonomyKind, id: &TaxonId, icon: &str) -> Result<Taxon> {
        require_hierarchical(kind)?;
        let patch = TaxonPatch {
            icon: Some(parse_icon(icon)?),
            subcategories: None,
        };
        self.store.update(kind, id, &patch).await
    }

    pub async fn add_subcategory(
        &self,
        kind: TaxonomyKind,
        id: &TaxonId,
        name: &str,
    ) -> Result<Taxon> {
        require_hierarchical(kind)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Subcategory name is required.".to_string(),
            ));
        }
        if name.contains(',') {
            return Err(AppError::ValidationError(
                "Subcategory names cannot contain commas".to_string(),
            ));
        }
        if name.chars().count() > MAX_SUBCATEGORY_LENGTH {
            return Err(AppError::ValidationError(format!(
                "Subcategory is longer than {} characters",
                MAX_SUBCATEGORY_LENGTH
            )));
        }

        let taxon = self.get(kind, id).await?;
        let key = subcategory_key(name);
        if taxon
            .subcategories
            .iter()
            .any(|existing| subcategory_key(existing) == key)
        {
            return Err(AppError::Conflict(format!(
                "'{}' already has subcategory '{}'",
                taxon.name, name
            )));
        }

        let mut subcategories = taxon.subcategories;
        subcategories.push(name.to_string());
        self.store
            .update(
                kind,
                id,
                &TaxonPatch {
                    icon: None,
                    subcategories: Some(subcategories),
                },
            )
            .await
    }

    /// Matches the same way import de-duplicates: trimmed, case-insensitive.
    pub async fn remove_subcategory(
        &self,
        kind: TaxonomyKind,
        id: &TaxonId,
        name: &str,
    ) -> Result<Taxon> {
        require_hierarchical(kind)?;
        let taxon = self.get(kind, id).await?;
        let key = subcategory_key(name);

        let before = taxon.subcategories.len();
        let subcategories: Vec<String> = taxon
            .subcategories
            .into_iter()
            .filter(|existing| subcategory_key(existing) != key)
            .collect();
        if subcategories.len() == before {
            return Err(AppError::NotFound(format!(
                "Subcategory '{}' on '{}'",
                name.trim(),
                taxon.name
            )));
        }

        self.store
            .update(
                kind,
                id,
                &TaxonPatch {
                    icon: None,
                    subcategories: Some(subcategories),
                },
            )
            .await
    }

    async fn get(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<Taxon> {
        self.store
            .find_by_id(kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} entry {}", kind, id)))
    }
}

/// Every row folded into a rejected write gets its own error.
fn save_failures(rows: &[usize], name: &str, err: &AppError) -> Vec<RowError> {
    rows.iter()
        .map(|&row| {
            RowError::new(row, format!("could not be saved: {}", err)).with_value(name)
        })
        .collect()
}

fn require_hierarchical(kind: TaxonomyKind) -> Result<()> {
    if kind.flavor().is_hierarchical() {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "{} have no icons or subcategories",
            kind.label()
        )))
    }
}

fn parse_icon(raw: &str) -> Result<Icon> {
    Icon::from_key(raw)
        .ok_or_else(|| AppError::ValidationError(format!("Unknown icon '{}'", raw.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::InMemoryTaxonomyStore;
    use async_trait::async_trait;

    fn use_case() -> (TaxonomyUseCase, Arc<InMemoryTaxonomyStore>) {
        let store = Arc::new(InMemoryTaxonomyStore::new());
        (TaxonomyUseCase::new(store.clone()), store)
    }

    fn candidate(row: usize, name: &str, icon: Option<&str>, subs: &[&str]) -> CandidateEntity {
        CandidateEntity {
            row,
            name: name.to_string(),
            icon: icon.map(str::to_string),
            subcategories: subs.iter().map(|s| s.to_string()).collect(),
            slug: String::new(),
        }
    }

    /// Delegates to the in-memory store but refuses chosen writes.
    struct FlakyStore {
        inner: InMemoryTaxonomyStore,
        reject_slug: Option<&'static str>,
        unavailable_on_update: bool,
    }

    #[async_trait]
    impl TaxonomyStore for FlakyStore {
        async fn list(&self, kind: TaxonomyKind) -> Result<Vec<Taxon>> {
            self.inner.list(kind).await
        }

        async fn find_by_id(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<Option<Taxon>> {
            self.inner.find_by_id(kind, id).await
        }

        async fn find_by_slug(&self, kind: TaxonomyKind, slug: &str) -> Result<Option<Taxon>> {
            self.inner.find_by_slug(kind, slug).await
        }

        async fn create(&self, kind: TaxonomyKind, taxon: NewTaxon) -> Result<Taxon> {
            if self.reject_slug == Some(taxon.slug.as_str()) {
                return Err(AppError::StoreError("disk quota exceeded".to_string()));
            }
            self.inner.create(kind, taxon).await
        }

        async fn update(
            &self,
            kind: TaxonomyKind,
            id: &TaxonId,
            patch: &TaxonPatch,
        ) -> Result<Taxon> {
            if self.unavailable_on_update {
                return Err(AppError::StoreUnavailable("pool closed".to_string()));
            }
            self.inner.update(kind, id, patch).await
        }

        async fn delete(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<()> {
            self.inner.delete(kind, id).await
        }
    }

    #[tokio::test]
    async fn test_csv_scenario_merges_duplicate_rows() {
        let (use_case, _) = use_case();
        let csv = "Name,Icon,Subcategories\n\
                   Development,Code,\"Frontend, Backend\"\n\
                   Development,,\"Backend, DevOps\"\n";

        let report = use_case
            .import_upload(TaxonomyKind::JobCategories, csv.as_bytes())
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 0);
        assert!(report.errors.is_empty());

        let taxa = use_case.list(TaxonomyKind::JobCategories).await.unwrap();
        assert_eq!(taxa.len(), 1);
        assert_eq!(taxa[0].name, "Development");
        assert_eq!(taxa[0].icon, Some(Icon::Code));
        assert_eq!(taxa[0].subcategories, vec!["Frontend", "Backend", "DevOps"]);
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let (use_case, _) = use_case();
        let csv = "Name,Icon,Subcategories\nDesign,Palette,UI\nSales,,\nFinance,Calculator,\n";

        let first = use_case
            .import_upload(TaxonomyKind::JobCategories, csv.as_bytes())
            .await
            .unwrap();
        assert_eq!((first.created, first.updated), (3, 0));

        let second = use_case
            .import_upload(TaxonomyKind::JobCategories, csv.as_bytes())
            .await
            .unwrap();
        assert_eq!((second.created, second.updated, second.skipped), (0, 0, 3));
    }

    #[tokio::test]
    async fn test_empty_name_row_is_isolated() {
        let (use_case, _) = use_case();
        let candidates = vec![
            candidate(1, "Backend", None, &[]),
            candidate(2, "Frontend", None, &[]),
            candidate(3, "", None, &[]),
            candidate(4, "Mobile", None, &[]),
            candidate(5, "Data", None, &[]),
        ];

        let report = use_case
            .import_entities(TaxonomyKind::Skills, candidates)
            .await
            .unwrap();
        assert_eq!(report.created, 4);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Row 3:"));
    }

    #[tokio::test]
    async fn test_unreadable_upload_touches_nothing() {
        let (use_case, store) = use_case();
        let result = use_case
            .import_upload(TaxonomyKind::JobCategories, b"Name\0\0\x01")
            .await;
        assert!(matches!(result, Err(AppError::FormatError(_))));
        assert!(store
            .list(TaxonomyKind::JobCategories)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_store_rejection_becomes_row_error() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryTaxonomyStore::new(),
            reject_slug: Some("sales"),
            unavailable_on_update: false,
        });
        let use_case = TaxonomyUseCase::new(store.clone());

        let report = use_case
            .import_entities(
                TaxonomyKind::JobCategories,
                vec![
                    candidate(2, "Design", Some("Palette"), &[]),
                    candidate(3, "Sales", None, &[]),
                    candidate(4, "Legal", Some("Scale"), &[]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Row 3: could not be saved"));
        assert!(report.errors[0].contains("\"Sales\""));

        let names: Vec<String> = store
            .list(TaxonomyKind::JobCategories)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Design", "Legal"]);
    }

    #[tokio::test]
    async fn test_rejected_merged_create_reports_every_row() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryTaxonomyStore::new(),
            reject_slug: Some("sales"),
            unavailable_on_update: false,
        });
        let use_case = TaxonomyUseCase::new(store);

        let report = use_case
            .import_entities(
                TaxonomyKind::JobCategories,
                vec![
                    candidate(2, "Sales", None, &["Retail"]),
                    candidate(3, "Design", None, &[]),
                    candidate(4, "sales", None, &["B2B"]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("Row 2: could not be saved"));
        assert!(report.errors[1].starts_with("Row 4: could not be saved"));
    }

    #[tokio::test]
    async fn test_export_of_iconless_taxon_reimports_unchanged() {
        let (use_case, store) = use_case();
        let taxon = store
            .create(
                TaxonomyKind::JobCategories,
                NewTaxon {
                    name: "Design".to_string(),
                    slug: "design".to_string(),
                    icon: None,
                    subcategories: vec!["UI".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(taxon.icon, None);

        let exported = use_case
            .export_template(TaxonomyKind::JobCategories, TabularFormat::Csv)
            .await
            .unwrap();
        let report = use_case
            .import_upload(TaxonomyKind::JobCategories, &exported.bytes)
            .await
            .unwrap();
        assert_eq!((report.created, report.updated, report.skipped), (0, 0, 1));
    }

    #[tokio::test]
    async fn test_ignored_columns_do_not_produce_row_errors() {
        let (use_case, _) = use_case();
        let report = use_case
            .import_upload(
                TaxonomyKind::Skills,
                b"Name\nRust\n,note in ignored column\nGo\n",
            )
            .await
            .unwrap();
        assert_eq!(report.created, 2);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_aborts_import() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryTaxonomyStore::new(),
            reject_slug: None,
            unavailable_on_update: true,
        });
        let use_case = TaxonomyUseCase::new(store.clone());
        use_case
            .create_one(TaxonomyKind::JobCategories, "Design", Some("Palette"))
            .await
            .unwrap();

        let result = use_case
            .import_entities(
                TaxonomyKind::JobCategories,
                vec![candidate(2, "Design", None, &["UI"])],
            )
            .await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_xlsx_export_reimports_without_changes() {
        let (use_case, _) = use_case();
        use_case
            .import_entities(
                TaxonomyKind::JobCategories,
                vec![
                    candidate(2, "Design", Some("Palette"), &["UI", "UX"]),
                    candidate(3, "Engineering", None, &["Backend"]),
                ],
            )
            .await
            .unwrap();

        let exported = use_case
            .export_template(TaxonomyKind::JobCategories, TabularFormat::Xlsx)
            .await
            .unwrap();
        assert_eq!(exported.file_name, "job_categories_template.xlsx");
        assert!(exported.bytes.starts_with(b"PK"));

        let report = use_case
            .import_upload(TaxonomyKind::JobCategories, &exported.bytes)
            .await
            .unwrap();
        assert_eq!((report.created, report.updated, report.skipped), (0, 0, 2));
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_create_one_rejects_slug_collision() {
        let (use_case, _) = use_case();
        let created = use_case
            .create_one(TaxonomyKind::JobCategories, "Data Science", None)
            .await
            .unwrap();
        assert_eq!(created.slug, "data-science");
        assert_eq!(created.icon, Some(Icon::Tag));

        let again = use_case
            .create_one(TaxonomyKind::JobCategories, "data  science", None)
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let flat = use_case
            .create_one(TaxonomyKind::Skills, "Rust", Some("Code"))
            .await
            .unwrap();
        assert_eq!(flat.icon, None);

        assert!(matches!(
            use_case.create_one(TaxonomyKind::Skills, "  ", None).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            use_case.create_one(TaxonomyKind::Skills, "!!!", None).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_subcategory_management() {
        let (use_case, _) = use_case();
        let taxon = use_case
            .create_one(TaxonomyKind::JobCategories, "Design", Some("palette"))
            .await
            .unwrap();

        let taxon = use_case
            .add_subcategory(TaxonomyKind::JobCategories, &taxon.id, " UI ")
            .await
            .unwrap();
        assert_eq!(taxon.subcategories, vec!["UI"]);

        assert!(matches!(
            use_case
                .add_subcategory(TaxonomyKind::JobCategories, &taxon.id, "ui")
                .await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            use_case
                .add_subcategory(TaxonomyKind::JobCategories, &taxon.id, "UX, Motion")
                .await,
            Err(AppError::ValidationError(_))
        ));

        let taxon = use_case
            .remove_subcategory(TaxonomyKind::JobCategories, &taxon.id, "  ui")
            .await
            .unwrap();
        assert!(taxon.subcategories.is_empty());
        assert!(matches!(
            use_case
                .remove_subcategory(TaxonomyKind::JobCategories, &taxon.id, "UI")
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_icon_updates() {
        let (use_case, _) = use_case();
        let taxon = use_case
            .create_one(TaxonomyKind::JobCategories, "Legal", None)
            .await
            .unwrap();

        let updated = use_case
            .update_icon(TaxonomyKind::JobCategories, &taxon.id, "Scale")
            .await
            .unwrap();
        assert_eq!(updated.icon, Some(Icon::Scale));

        assert!(matches!(
            use_case
                .update_icon(TaxonomyKind::JobCategories, &taxon.id, "Unicorn")
                .await,
            Err(AppError::ValidationError(_))
        ));

        let skill = use_case
            .create_one(TaxonomyKind::Skills, "Rust", None)
            .await
            .unwrap();
        assert!(matches!(
            use_case
                .update_icon(TaxonomyKind::Skills, &skill.id, "Code")
                .await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_one() {
        let (use_case, _) = use_case();
        let taxon = use_case
            .create_one(TaxonomyKind::CompanyCategories, "Fintech", None)
            .await
            .unwrap();
        use_case
            .delete_one(TaxonomyKind::CompanyCategories, &taxon.id)
            .await
            .unwrap();
        assert!(use_case
            .list(TaxonomyKind::CompanyCategories)
            .await
            .unwrap()
            .is_empty());
    }
}

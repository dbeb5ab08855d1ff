use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use super::connection::connect_taxonomy_pool;
use crate::domain::app_config::DatabaseConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::{Icon, NewTaxon, Taxon, TaxonId, TaxonPatch, TaxonomyKind};
use crate::infrastructure::db::TaxonomyStore;

const SELECT_COLUMNS: &str =
    "SELECT id, kind, name, slug, icon, subcategories, created_at, updated_at FROM taxa";

pub struct SqliteTaxonomyStore {
    pool: SqlitePool,
}

impl SqliteTaxonomyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(connect_taxonomy_pool(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Sorts sqlx failures into the three buckets the import pipeline cares about.
fn map_sqlx_error(action: &str, err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("Failed to {action}: slug already exists"))
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => AppError::StoreUnavailable(format!("Failed to {action}: {err}")),
        _ => AppError::StoreError(format!("Failed to {action}: {err}")),
    }
}

#[async_trait]
impl TaxonomyStore for SqliteTaxonomyStore {
    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<Taxon>> {
        let rows = sqlx::query_as::<_, TaxonEntity>(&format!(
            "{SELECT_COLUMNS} WHERE kind = ? ORDER BY rowid"
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list taxa", e))?;

        rows.into_iter().map(TaxonEntity::into_domain).collect()
    }

    async fn find_by_id(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<Option<Taxon>> {
        let row = sqlx::query_as::<_, TaxonEntity>(&format!(
            "{SELECT_COLUMNS} WHERE kind = ? AND id = ?"
        ))
        .bind(kind.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch taxon", e))?;

        row.map(TaxonEntity::into_domain).transpose()
    }

    async fn find_by_slug(&self, kind: TaxonomyKind, slug: &str) -> Result<Option<Taxon>> {
        let row = sqlx::query_as::<_, TaxonEntity>(&format!(
            "{SELECT_COLUMNS} WHERE kind = ? AND slug = ?"
        ))
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch taxon by slug", e))?;

        row.map(TaxonEntity::into_domain).transpose()
    }

    async fn create(&self, kind: TaxonomyKind, taxon: NewTaxon) -> Result<Taxon> {
        let id = TaxonId::new_v4();
        let now = Utc::now();
        let subcategories = encode_subcategories(&taxon.subcategories)?;

        sqlx::query(
            "INSERT INTO taxa (id, kind, name, slug, icon, subcategories, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(kind.as_str())
        .bind(&taxon.name)
        .bind(&taxon.slug)
        .bind(taxon.icon.map(|icon| icon.key()))
        .bind(subcategories)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(&format!("create '{}'", taxon.name), e))?;

        Ok(Taxon {
            id,
            kind,
            name: taxon.name,
            slug: taxon.slug,
            icon: taxon.icon,
            subcategories: taxon.subcategories,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, kind: TaxonomyKind, id: &TaxonId, patch: &TaxonPatch) -> Result<Taxon> {
        let mut taxon = self
            .find_by_id(kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} entry {}", kind, id)))?;

        patch.apply_to(&mut taxon);
        taxon.updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE taxa SET icon = ?, subcategories = ?, updated_at = ? WHERE kind = ? AND id = ?",
        )
        .bind(taxon.icon.map(|icon| icon.key()))
        .bind(encode_subcategories(&taxon.subcategories)?)
        .bind(taxon.updated_at)
        .bind(kind.as_str())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(&format!("update '{}'", taxon.name), e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} entry {}", kind, id)));
        }
        Ok(taxon)
    }

    async fn delete(&self, kind: TaxonomyKind, id: &TaxonId) -> Result<()> {
        let result = sqlx::query("DELETE FROM taxa WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete taxon", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} entry {}", kind, id)));
        }
        Ok(())
    }
}

fn encode_subcategories(subcategories: &[String]) -> Result<String> {
    serde_json::to_string(subcategories)
        .map_err(|e| AppError::Internal(format!("Failed to encode subcategories: {e}")))
}

#[derive(sqlx::FromRow)]
struct TaxonEntity {
    id: String,
    kind: String,
    name: String,
    slug: String,
    icon: Option<String>,
    subcategories: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaxonEntity {
    fn into_domain(self) -> Result<Taxon> {
        let kind = self
            .kind
            .parse::<TaxonomyKind>()
            .map_err(|_| AppError::StoreError(format!("Unknown taxonomy kind '{}'", self.kind)))?;
        let subcategories: Vec<String> = serde_json::from_str(&self.subcategories).map_err(|e| {
            AppError::StoreError(format!("Corrupt subcategories for {}: {e}", self.id))
        })?;

        Ok(Taxon {
            id: TaxonId(self.id),
            kind,
            name: self.name,
            slug: self.slug,
            icon: self.icon.as_deref().and_then(Icon::from_key),
            subcategories,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteTaxonomyStore {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..Default::default()
        };
        SqliteTaxonomyStore::connect(&config).await.unwrap()
    }

    fn design() -> NewTaxon {
        NewTaxon {
            name: "Design".to_string(),
            slug: "design".to_string(),
            icon: Some(Icon::Palette),
            subcategories: vec!["UI".to_string(), "UX".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = memory_store().await;
        let created = store
            .create(TaxonomyKind::JobCategories, design())
            .await
            .unwrap();

        let by_slug = store
            .find_by_slug(TaxonomyKind::JobCategories, "design")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_slug.id, created.id);
        assert_eq!(by_slug.icon, Some(Icon::Palette));
        assert_eq!(by_slug.subcategories, vec!["UI", "UX"]);

        assert!(store
            .find_by_slug(TaxonomyKind::Skills, "design")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unique_slug_is_conflict() {
        let store = memory_store().await;
        store
            .create(TaxonomyKind::JobCategories, design())
            .await
            .unwrap();
        let duplicate = store.create(TaxonomyKind::JobCategories, design()).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        // Kinds are separate namespaces.
        store.create(TaxonomyKind::Skills, design()).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_in_place_and_list_order() {
        let store = memory_store().await;
        let first = store
            .create(TaxonomyKind::JobCategories, design())
            .await
            .unwrap();
        store
            .create(
                TaxonomyKind::JobCategories,
                NewTaxon {
                    name: "Sales".to_string(),
                    slug: "sales".to_string(),
                    icon: Some(Icon::Tag),
                    subcategories: Vec::new(),
                },
            )
            .await
            .unwrap();

        let patch = TaxonPatch {
            icon: None,
            subcategories: Some(vec!["UI".to_string(), "UX".to_string(), "Motion".to_string()]),
        };
        let updated = store
            .update(TaxonomyKind::JobCategories, &first.id, &patch)
            .await
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.icon, Some(Icon::Palette));

        let listed = store.list(TaxonomyKind::JobCategories).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Design");
        assert_eq!(listed[0].subcategories, vec!["UI", "UX", "Motion"]);
        assert_eq!(listed[1].name, "Sales");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = memory_store().await;
        let created = store
            .create(TaxonomyKind::JobCategories, design())
            .await
            .unwrap();
        store
            .delete(TaxonomyKind::JobCategories, &created.id)
            .await
            .unwrap();
        assert!(matches!(
            store.delete(TaxonomyKind::JobCategories, &created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let store = memory_store().await;
        store.pool().close().await;
        assert!(matches!(
            store.list(TaxonomyKind::Skills).await,
            Err(AppError::StoreUnavailable(_))
        ));
    }
}

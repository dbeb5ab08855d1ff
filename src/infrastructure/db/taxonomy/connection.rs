use crate::domain::app_config::DatabaseConfig;
use crate::domain::error::{AppError, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

const TAXONOMY_SCHEMA_V1: &str = include_str!("../../../../resources/taxonomy/schema.sql");

pub async fn connect_taxonomy_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let db_url = normalize_db_url(&config.url);
    let in_memory = db_url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(&db_url)
        .map_err(|e| AppError::DatabaseError(format!("Failed to parse taxonomy DB URL: {e}")))?
        .create_if_missing(true)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .pragma("foreign_keys", "ON");
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    // Every connection to `:memory:` is its own database.
    let max_connections = if in_memory { 1 } else { config.max_connections };

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5));
    if in_memory {
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| AppError::StoreUnavailable(format!("Failed to connect taxonomy DB: {e}")))?;

    apply_migrations(&pool).await?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| AppError::StoreUnavailable(format!("Taxonomy DB health check failed: {e}")))?;

    Ok(pool)
}

/// Accepts a full `sqlite:` URL or a bare file path.
fn normalize_db_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("sqlite:") {
        raw.to_string()
    } else {
        format!("sqlite://{}", raw.replace('\\', "/"))
    }
}

async fn apply_migrations(pool: &SqlitePool) -> Result<()> {
    // PRAGMA user_version tracks the schema; v1 == schema.sql.
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to read taxonomy DB user_version: {e}"))
        })?;

    if version < 1 {
        apply_schema(pool, TAXONOMY_SCHEMA_V1).await?;
        sqlx::query("PRAGMA user_version = 1")
            .execute(pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to set taxonomy DB user_version: {e}"))
            })?;
        tracing::info!("Taxonomy DB schema initialised (v1)");
    }

    Ok(())
}

async fn apply_schema(pool: &SqlitePool, schema: &str) -> Result<()> {
    for statement in schema.split(';') {
        let stmt = statement.trim();
        if stmt.is_empty() {
            continue;
        }
        sqlx::query(stmt).execute(pool).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to apply taxonomy schema: {e}"))
        })?;
    }
    Ok(())
}

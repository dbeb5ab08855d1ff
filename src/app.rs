use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::application::TaxonomyUseCase;
use crate::domain::app_config::AppConfig;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::load_config;
use crate::infrastructure::db::{InMemoryTaxonomyStore, SqliteTaxonomyStore, TaxonomyStore};

pub async fn run() -> Result<()> {
    let config = load_config()?;
    init_tracing(&config);

    let store = open_store(&config).await?;
    let taxonomy = Arc::new(TaxonomyUseCase::new(store));

    let server = crate::interfaces::http::start_server(taxonomy, &config)?;
    server
        .await
        .map_err(|e| AppError::IoError(format!("HTTP server stopped: {}", e)))
}

/// `RUST_LOG` wins over `log.filter` when set.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn TaxonomyStore>> {
    if config.database.is_memory() {
        tracing::warn!("Using the in-memory taxonomy store; data is lost on exit");
        return Ok(Arc::new(InMemoryTaxonomyStore::new()));
    }

    let store = SqliteTaxonomyStore::connect(&config.database).await?;
    tracing::info!(url = %config.database.url, "Taxonomy DB ready");
    Ok(Arc::new(store))
}

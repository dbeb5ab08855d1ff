use serde::{Deserialize, Serialize};

/// Service configuration. Loaded by `infrastructure::config::load_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub import: ImportConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL or file path; `memory` selects the in-process store
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Upper bound for a single upload body
    pub max_upload_bytes: usize,
    /// `xlsx` or `csv`, used when the export request names no format
    pub default_export_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://taxonomy.db".to_string(),
            max_connections: 4,
            busy_timeout_secs: 5,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024, // 10MB
            default_export_format: "xlsx".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            import: ImportConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case("memory")
    }
}

impl AppConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".to_string());
        }
        if self.database.url.trim().is_empty() {
            return Err("database.url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("database.max_connections must be > 0".to_string());
        }
        if self.import.max_upload_bytes == 0 {
            return Err("import.max_upload_bytes must be > 0".to_string());
        }
        if !matches!(
            self.import.default_export_format.to_ascii_lowercase().as_str(),
            "xlsx" | "csv"
        ) {
            return Err(format!(
                "import.default_export_format must be xlsx or csv, got '{}'",
                self.import.default_export_format
            ));
        }
        Ok(())
    }
}

//! Configuration schema (doclink.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no password is configured
pub const PASSWORD_ENV: &str = "DOCLINK_PASSWORD";

/// Settings for the HTTP API backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the DocLink server, e.g. `https://doclink.example.com/`
    pub url: String,

    pub user_id: String,

    /// Never written back to disk
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default = "default_machine_name")]
    pub machine_name: String,

    /// Present for cloud tenants; on-premise servers log in without one
    #[serde(default)]
    pub site_code: Option<String>,
}

/// Settings for the direct SQL Server backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlSettings {
    pub server: String,

    #[serde(default = "default_sql_port")]
    pub port: u16,

    pub database: String,

    pub username: String,

    /// Never written back to disk
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Accept the server certificate without validation
    #[serde(default)]
    pub trust_cert: bool,
}

/// Which backend to talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Api(ApiSettings),
    Sql(SqlSettings),
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Api(_) => "api",
            Self::Sql(_) => "sql",
        }
    }

    /// Configured password, falling back to `DOCLINK_PASSWORD`
    pub fn password(&self) -> Option<String> {
        let configured = match self {
            Self::Api(settings) => settings.password.clone(),
            Self::Sql(settings) => settings.password.clone(),
        };
        configured.or_else(|| std::env::var(PASSWORD_ENV).ok())
    }
}

/// Accessible-items cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds before a populated whitelist is considered stale
    #[serde(default = "default_whitelist_ttl")]
    pub whitelist_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            whitelist_ttl_secs: default_whitelist_ttl(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `<name>.sqldat` templates
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Directory generated scripts are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Append every statement run by the SQL backend to this file
    #[serde(default)]
    pub journal: Option<PathBuf>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub backend: Option<BackendConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            output_dir: default_output_dir(),
            log_filter: default_log_filter(),
            journal: None,
            cache: CacheConfig::default(),
            backend: None,
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Backend section, required by every command that talks to DocLink
    pub fn backend(&self) -> Result<&BackendConfig, ConfigError> {
        self.backend.as_ref().ok_or(ConfigError::MissingBackend)
    }

    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.template_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn journal_path(&self) -> Option<PathBuf> {
        self.journal.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_whitelist_ttl() -> u64 {
    300
}

fn default_sql_port() -> u16 {
    1433
}

fn default_machine_name() -> String {
    "doclink-cli".to_string()
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("No [backend] section configured")]
    MissingBackend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.template_dir, PathBuf::from("templates"));
        assert_eq!(config.cache.whitelist_ttl_secs, 300);
        assert!(config.backend.is_none());
    }

    #[test]
    fn api_backend_section() {
        let config = Config::from_toml(
            r#"
            template_dir = "sql"

            [backend]
            type = "api"
            url = "https://doclink.example.com/"
            user_id = "admin"
            site_code = "ACME"
            "#,
        )
        .unwrap();

        match config.backend().unwrap() {
            BackendConfig::Api(api) => {
                assert_eq!(api.site_code.as_deref(), Some("ACME"));
                assert_eq!(api.machine_name, "doclink-cli");
            }
            other => panic!("expected api backend, got {:?}", other),
        }
        assert_eq!(config.template_dir, PathBuf::from("sql"));
    }

    #[test]
    fn sql_backend_section() {
        let config = Config::from_toml(
            r#"
            journal = "transactions.txt"

            [cache]
            whitelist_ttl_secs = 60

            [backend]
            type = "sql"
            server = "db01"
            database = "DocLink"
            username = "sa"
            password = "secret"
            "#,
        )
        .unwrap();

        let backend = config.backend().unwrap();
        assert_eq!(backend.kind(), "sql");
        assert_eq!(backend.password().as_deref(), Some("secret"));
        assert_eq!(config.cache.whitelist_ttl_secs, 60);
        match backend {
            BackendConfig::Sql(sql) => assert_eq!(sql.port, 1433),
            other => panic!("expected sql backend, got {:?}", other),
        }
    }

    #[test]
    fn missing_backend() {
        let config = Config::from_toml("").unwrap();
        assert!(matches!(config.backend(), Err(ConfigError::MissingBackend)));
    }

    #[test]
    fn password_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doclink.toml");

        let mut config = Config::default();
        config.backend = Some(BackendConfig::Sql(SqlSettings {
            server: "db01".to_string(),
            port: 1433,
            database: "DocLink".to_string(),
            username: "sa".to_string(),
            password: Some("secret".to_string()),
            trust_cert: true,
        }));
        config.save_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("secret"));

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.project_root, dir.path());
        assert_eq!(loaded.template_path(), dir.path().join("templates"));
        match loaded.backend().unwrap() {
            BackendConfig::Sql(sql) => assert!(sql.password.is_none()),
            other => panic!("expected sql backend, got {:?}", other),
        }
    }
}

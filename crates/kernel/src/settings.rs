use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use bookshelf_db::DbConfig;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    /// Development-only surfaces (API docs) are enabled here.
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Local)
    }

    fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay and
    /// `BOOKSHELF_*` variables. The config directory comes from
    /// `BOOKSHELF_CONFIG_DIR`, falling back to `./config`.
    pub fn load() -> anyhow::Result<Self> {
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir)
    }

    /// Load configuration from an explicit config directory.
    pub fn load_from(config_dir: &Path) -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let parsed_environment = Environment::parse(&environment)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The selector variable wins over any `environment` key in the files.
        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Storage selection. Leaving `url` unset runs against an in-memory store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_max_connections() -> u32 {
        5
    }

    fn default_busy_timeout_ms() -> u64 {
        5000
    }

    /// Label used in logs; never prints anything beyond the location.
    pub fn describe(&self) -> &str {
        self.url.as_deref().unwrap_or("in-memory")
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: Self::default_max_connections(),
            busy_timeout_ms: Self::default_busy_timeout_ms(),
        }
    }
}

impl From<&DatabaseSettings> for DbConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        DbConfig {
            url: settings.url.clone().filter(|url| !url.trim().is_empty()),
            max_connections: settings.max_connections,
            busy_timeout_ms: settings.busy_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_level")]
    pub level: String,
}

impl TelemetrySettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Input validation policy for submitted records.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "ValidationSettings::default_max_len")]
    pub max_title_len: Option<usize>,
    #[serde(default = "ValidationSettings::default_max_len")]
    pub max_author_len: Option<usize>,
    #[serde(default = "ValidationSettings::default_require_url_cover")]
    pub require_url_cover: bool,
}

impl ValidationSettings {
    fn default_max_len() -> Option<usize> {
        Some(100)
    }

    fn default_require_url_cover() -> bool {
        true
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            max_title_len: Self::default_max_len(),
            max_author_len: Self::default_max_len(),
            require_url_cover: Self::default_require_url_cover(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationSettings {
    #[serde(default = "PaginationSettings::default_limit")]
    pub default_limit: u32,
    #[serde(default = "PaginationSettings::default_max_limit")]
    pub max_limit: u32,
}

impl PaginationSettings {
    fn default_limit() -> u32 {
        100
    }

    fn default_max_limit() -> u32 {
        1000
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: Self::default_limit(),
            max_limit: Self::default_max_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
        assert!(settings.environment.is_development());
        assert!(!Environment::Production.is_development());
    }

    #[test]
    fn default_database_is_in_memory() {
        let settings = Settings::default();
        assert!(settings.database.url.is_none());
        assert_eq!(settings.database.describe(), "in-memory");
    }

    #[test]
    fn blank_database_url_maps_to_in_memory() {
        let settings = DatabaseSettings {
            url: Some("  ".to_string()),
            ..DatabaseSettings::default()
        };
        let config = DbConfig::from(&settings);
        assert!(config.url.is_none());
    }

    #[test]
    fn default_policies_match_catalog_rules() {
        let settings = Settings::default();
        assert_eq!(settings.validation.max_title_len, Some(100));
        assert_eq!(settings.validation.max_author_len, Some(100));
        assert!(settings.validation.require_url_cover);
        assert_eq!(settings.pagination.default_limit, 100);
        assert_eq!(settings.pagination.max_limit, 1000);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(Environment::parse("qa").is_err());
        assert_eq!(Environment::parse("staging").unwrap(), Environment::Staging);
    }

    #[test]
    fn files_are_layered_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "[server]\nport = 9090\n\n[pagination]\nmax_limit = 50\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("local.toml"),
            "[database]\nurl = \"data/books.db\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path()).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.pagination.max_limit, 50);
        assert_eq!(settings.pagination.default_limit, 100);
        assert_eq!(settings.database.url.as_deref(), Some("data/books.db"));
    }
}

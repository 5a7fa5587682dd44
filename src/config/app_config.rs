use core::fmt;
use std::{env, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use crate::models::migration::FailurePolicy;

pub const DATABASE_URL_KEY: &str = "database.url";

/// Single-variable form kept for deployments that predate the layered config.
pub const LEGACY_DATABASE_URL_VAR: &str = "POLICYCRAFT_POSTGRES_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Dev,
    Prod,
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Runtime::Dev => write!(f, "development"),
            Runtime::Prod => write!(f, "production"),
        }
    }
}

impl Runtime {
    pub fn from_env() -> Self {
        env::var("ENVIRONMENT").unwrap_or_default().into()
    }
}

impl From<String> for Runtime {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PRODUCTION" => Runtime::Prod,
            _ => Runtime::Dev,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Parses the connection target without touching the network.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigurationError> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigurationError::Missing(DATABASE_URL_KEY))?;

        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(ConfigurationError::Invalid {
                key: DATABASE_URL_KEY,
                reason: "expected a postgres:// or postgresql:// url".into(),
            });
        }

        let options =
            PgConnectOptions::from_str(url).map_err(|e| ConfigurationError::Invalid {
                key: DATABASE_URL_KEY,
                reason: e.to_string(),
            })?;

        if options.get_database().is_none_or(str::is_empty) {
            return Err(ConfigurationError::Invalid {
                key: DATABASE_URL_KEY,
                reason: "no database name in connection target".into(),
            });
        }

        Ok(options)
    }

    /// Checks every database setting and returns the parsed connection target.
    pub fn validate(&self) -> Result<PgConnectOptions, ConfigurationError> {
        let options = self.connect_options()?;

        if self.max_connections == 0 {
            return Err(ConfigurationError::Invalid {
                key: "database.max_connections",
                reason: "must be at least 1".into(),
            });
        }

        if self.acquire_timeout_secs == 0 {
            return Err(ConfigurationError::Invalid {
                key: "database.acquire_timeout_secs",
                reason: "must be at least 1 second".into(),
            });
        }

        Ok(options)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_true")]
    pub on_startup: bool,
    #[serde(default)]
    pub on_shutdown: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            on_startup: true,
            on_shutdown: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Loads `config/{runtime}.toml` (optional), then `POLICYCRAFT__*`
    /// variables, then the legacy `POLICYCRAFT_POSTGRES_URL`.
    pub fn load() -> Result<Self, ConfigurationError> {
        let runtime = Runtime::from_env();

        let raw = Config::builder()
            .add_source(File::with_name(&format!("config/{}", runtime)).required(false))
            .add_source(
                Environment::with_prefix("POLICYCRAFT")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(DATABASE_URL_KEY, env::var(LEGACY_DATABASE_URL_VAR).ok())?
            .build()?;

        Self::from_config(raw)
    }

    pub fn from_config(raw: Config) -> Result<Self, ConfigurationError> {
        let config: AppConfig = raw.try_deserialize()?;
        config.database.validate()?;
        Ok(config)
    }
}

//! Configuration management for yougile-sync
//!
//! This module handles loading, parsing, and validation of configuration files.
//! Secrets (API token, database URL) are never stored in the file; the file
//! only names the environment variables that carry them.

use crate::constants::{
    CONFIG_GENERATED, DEFAULT_API_BASE_URL, DEFAULT_DATABASE_URL_ENV, DEFAULT_PAGE_DELAY_MS, DEFAULT_PAGE_SIZE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SCHEMA, DEFAULT_TOKEN_ENV, MAX_PAGE_SIZE, SCHEMA_ENV,
};
use crate::sync::tags::TagBindings;
use crate::utils::datetime;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub tags: TagBindings,
    pub logging: LoggingConfig,
}

/// How page requests are parameterised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStyle {
    /// `limit` / `offset` query parameters
    #[default]
    Offset,
    /// `page` / `pageSize` query parameters, pages numbered from 1
    Page,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    /// Records requested per page
    pub page_size: u32,
    /// Pause between consecutive page requests
    pub page_delay_ms: u64,
    /// Timeout applied to every single request
    pub request_timeout_secs: u64,
    pub pagination: PaginationStyle,
    pub retry: RetryConfig,
}

/// Backoff settings for transient API failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_factor: f64,
    pub max_backoff_ms: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Environment variable holding the connection URL
    pub url_env: String,
    /// Target schema (Postgres only); `PG_SCHEMA` overrides it
    pub schema: String,
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Loop mode interval in minutes
    pub interval_minutes: u64,
    /// Re-pull tasks created within this many days on each run (0 = disabled)
    pub refresh_window_days: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to a file
    pub file: bool,
    /// Log level filter: off, error, warn, info, debug, trace
    pub level: String,
    /// Level for lines on stderr; the CLI already prints progress milestones
    pub console_level: String,
    /// Explicit log file path; defaults to the user data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            pagination: PaginationStyle::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 1_000,
            backoff_factor: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: DEFAULT_DATABASE_URL_ENV.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            refresh_window_days: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: false,
            level: "info".to_string(),
            console_level: "warn".to_string(),
            path: None,
        }
    }
}

/// Credentials resolved from the environment
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_token: String,
    pub database_url: String,
}

/// Check that a name can be used as an unquoted SQL identifier.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file();

        let mut config = if let Some(path) = config_path {
            Self::load_from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from("yougile-sync.toml");
        if current_dir_config.exists() {
            return Some(current_dir_config);
        }

        // 2. Check XDG config directory
        let xdg_config = Self::get_default_config_path().ok()?;
        xdg_config.exists().then_some(xdg_config)
    }

    /// Apply environment overrides that are not secrets
    pub fn apply_env_overrides(&mut self) {
        if let Ok(schema) = std::env::var(SCHEMA_ENV) {
            if !schema.trim().is_empty() {
                self.database.schema = schema.trim().to_string();
            }
        }
    }

    /// Read the API token and database URL from the configured variables
    pub fn credentials(&self) -> Result<Credentials> {
        let api_token = read_env(&self.api.token_env)?;
        let database_url = read_env(&self.database.url_env)?;
        Ok(Credentials {
            api_token,
            database_url,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url cannot be empty");
        }
        let base_url = reqwest::Url::parse(self.api.base_url.trim())
            .with_context(|| format!("api.base_url '{}' is not a valid URL", self.api.base_url))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            anyhow::bail!("api.base_url must use http or https, got '{}'", base_url.scheme());
        }
        if self.api.page_size == 0 || self.api.page_size > MAX_PAGE_SIZE {
            anyhow::bail!(
                "api.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.api.page_size
            );
        }
        if self.api.request_timeout_secs == 0 {
            anyhow::bail!("api.request_timeout_secs must be positive");
        }

        let retry = &self.api.retry;
        if retry.max_attempts == 0 {
            anyhow::bail!("api.retry.max_attempts must be at least 1");
        }
        if !retry.backoff_factor.is_finite() || retry.backoff_factor < 1.0 {
            anyhow::bail!("api.retry.backoff_factor must be >= 1.0, got {}", retry.backoff_factor);
        }
        if retry.max_backoff_ms < retry.initial_backoff_ms {
            anyhow::bail!("api.retry.max_backoff_ms cannot be smaller than initial_backoff_ms");
        }

        if !is_plain_identifier(&self.database.schema) {
            anyhow::bail!("database.schema '{}' is not a valid SQL identifier", self.database.schema);
        }

        if self.sync.interval_minutes == 0 || self.sync.interval_minutes > 1440 {
            anyhow::bail!("sync.interval_minutes must be between 1 and 1440 (24 hours)");
        }

        self.tags.validate()?;

        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            anyhow::bail!("Invalid logging.level '{}'", self.logging.level);
        }
        match self.logging.console_level.parse::<log::LevelFilter>() {
            Ok(log::LevelFilter::Off) => anyhow::bail!("logging.console_level must show at least errors"),
            Ok(_) => {}
            Err(_) => anyhow::bail!("Invalid logging.console_level '{}'", self.logging.console_level),
        }

        Ok(())
    }

    /// Generate default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        // Add header comment
        let header = format!(
            "# yougile-sync configuration file\n# Generated on {}\n#\n# The API token and database URL are read from the environment\n# variables named by api.token_env and database.url_env.\n\n",
            chrono::Local::now().format(datetime::DATE_FORMAT)
        );

        let full_content = header + &toml_content;

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(&path, full_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        log::info!("{}: {}", CONFIG_GENERATED, path.as_ref().display());
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn get_xdg_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
            .map(|dir| dir.join("yougile-sync"))
    }

    /// Get the default config file path
    pub fn get_default_config_path() -> Result<PathBuf> {
        Ok(Self::get_xdg_config_dir()?.join("config.toml"))
    }
}

fn read_env(name: &str) -> Result<String> {
    let value = std::env::var(name).with_context(|| format!("Environment variable {name} is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Environment variable {name} is empty");
    }
    Ok(value.trim().to_string())
}

//! Bootstrap configuration loading
//!
//! Configuration sources, highest priority first:
//! 1. Explicit path (command-line argument)
//! 2. `PMFY_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/pmfy/config.toml` on Linux)
//! 4. Built-in defaults
//!
//! A missing config file is not an error: every field has a default.
//! Credentials may also come from the environment; see `pmfy_mood::config`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "PMFY_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External service endpoints and credentials
    #[serde(default)]
    pub services: ServicesConfig,

    /// Batch and recommendation tuning
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// External service configuration
///
/// Credentials are optional here because the environment may supply them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// SoundCharts application id (`x-app-id` header)
    #[serde(default)]
    pub soundcharts_app_id: Option<String>,

    /// SoundCharts API key (`x-api-key` header)
    #[serde(default)]
    pub soundcharts_api_key: Option<String>,

    /// SoundCharts API base URL
    #[serde(default = "default_soundcharts_base_url")]
    pub soundcharts_base_url: String,

    /// Last.fm API key
    #[serde(default)]
    pub lastfm_api_key: Option<String>,

    /// Base URL of the model server hosting the mood classifier
    #[serde(default)]
    pub classifier_url: Option<String>,

    /// Look up cover art for recommendations
    #[serde(default = "default_true")]
    pub cover_art: bool,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            soundcharts_app_id: None,
            soundcharts_api_key: None,
            soundcharts_base_url: default_soundcharts_base_url(),
            lastfm_api_key: None,
            classifier_url: None,
            cover_art: true,
        }
    }
}

/// Batch resolution and recommendation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Maximum in-flight fetches per batch stage
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay; doubles per attempt
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Retry delay cap
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Entries per stage cache before LRU eviction
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Timeout applied to every outbound call
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Timeout for each per-mood recommendation task
    #[serde(default = "default_recommendation_timeout_ms")]
    pub recommendation_timeout_ms: u64,

    /// Candidates requested per keyword search
    #[serde(default = "default_keyword_limit")]
    pub keyword_limit: usize,

    /// Randomise keyword order per run
    #[serde(default = "default_true")]
    pub shuffle_keywords: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            cache_capacity: default_cache_capacity(),
            call_timeout_ms: default_call_timeout_ms(),
            recommendation_timeout_ms: default_recommendation_timeout_ms(),
            keyword_limit: default_keyword_limit(),
            shuffle_keywords: true,
        }
    }
}

impl PipelineSettings {
    /// Reject settings that would stall or disable the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("pipeline.concurrency must be at least 1".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config("pipeline.cache_capacity must be at least 1".to_string()));
        }
        if self.keyword_limit == 0 {
            return Err(Error::Config("pipeline.keyword_limit must be at least 1".to_string()));
        }
        if self.call_timeout_ms == 0 || self.recommendation_timeout_ms == 0 {
            return Err(Error::Config("pipeline timeouts must be non-zero".to_string()));
        }
        if self.call_timeout_ms.saturating_mul(2) > self.recommendation_timeout_ms {
            return Err(Error::Config(format!(
                "pipeline.recommendation_timeout_ms ({}) must be at least twice pipeline.call_timeout_ms ({})",
                self.recommendation_timeout_ms, self.call_timeout_ms
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::Config(format!(
                "pipeline.initial_backoff_ms ({}) exceeds pipeline.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_soundcharts_base_url() -> String {
    "https://customer.api.soundcharts.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    6
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    2000
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_call_timeout_ms() -> u64 {
    3000
}

fn default_recommendation_timeout_ms() -> u64 {
    10_000
}

fn default_keyword_limit() -> usize {
    5
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no explicit path is given and neither the environment
/// nor the platform config directory points at an existing file.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("pmfy").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.pipeline.validate()?;
    Ok(config)
}

/// Load configuration with graceful degradation
///
/// An explicitly requested file must exist and parse. A file discovered
/// implicitly that fails to parse is reported and replaced by defaults.
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) if cli_arg.is_some() => {
            let config = load_toml_config(&path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        Some(path) => match load_toml_config(&path) {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Ignoring unusable config file {}: {}", path.display(), e);
                Ok(TomlConfig::default())
            }
        },
        None => {
            info!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write config to disk, creating parent directories
///
/// Writes to a sibling temp file first, then renames over the target.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Write the built-in defaults to `path` as a starting config
///
/// Refuses to replace an existing file.
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::Config(format!("{} already exists", path.display())));
    }
    write_toml_config(&TomlConfig::default(), path)
}

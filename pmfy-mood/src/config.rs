//! Service credential resolution
//!
//! Each credential is resolved ENV → TOML. When both sources are set the
//! environment wins and a warning is logged.

use pmfy_common::config::ServicesConfig;
use pmfy_common::{Error, Result};
use tracing::{info, warn};

pub const SOUNDCHARTS_APP_ID_ENV: &str = "PMFY_SOUNDCHARTS_APP_ID";
pub const SOUNDCHARTS_API_KEY_ENV: &str = "PMFY_SOUNDCHARTS_API_KEY";
pub const LASTFM_API_KEY_ENV: &str = "PMFY_LASTFM_API_KEY";
pub const CLASSIFIER_URL_ENV: &str = "PMFY_CLASSIFIER_URL";

/// Fully resolved service settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCredentials {
    pub soundcharts_base_url: String,
    pub soundcharts_app_id: String,
    pub soundcharts_api_key: String,
    pub lastfm_api_key: String,
    pub classifier_url: String,
    pub cover_art: bool,
}

/// Resolve every required credential
pub fn resolve_credentials(services: &ServicesConfig) -> Result<ServiceCredentials> {
    Ok(ServiceCredentials {
        soundcharts_base_url: services.soundcharts_base_url.clone(),
        soundcharts_app_id: resolve_setting(
            "SoundCharts app id",
            SOUNDCHARTS_APP_ID_ENV,
            services.soundcharts_app_id.as_deref(),
            "soundcharts_app_id",
        )?,
        soundcharts_api_key: resolve_setting(
            "SoundCharts API key",
            SOUNDCHARTS_API_KEY_ENV,
            services.soundcharts_api_key.as_deref(),
            "soundcharts_api_key",
        )?,
        lastfm_api_key: resolve_setting(
            "Last.fm API key",
            LASTFM_API_KEY_ENV,
            services.lastfm_api_key.as_deref(),
            "lastfm_api_key",
        )?,
        classifier_url: resolve_setting(
            "Classifier URL",
            CLASSIFIER_URL_ENV,
            services.classifier_url.as_deref(),
            "classifier_url",
        )?,
        cover_art: services.cover_art,
    })
}

/// Resolve one setting from environment, then TOML
pub fn resolve_setting(label: &str, env_var: &str, toml_value: Option<&str>, toml_key: &str) -> Result<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment ({}) and TOML config. Using environment (highest priority).",
            label, env_var
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Ok(value.trim().to_string());
    }

    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", label);
        return Ok(value.trim().to_string());
    }

    Err(Error::Config(format!(
        "{} not configured. Please configure using one of:\n\
         1. Environment: {}=<value>\n\
         2. TOML config: [services] {} = \"<value>\"",
        label, env_var, toml_key
    )))
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

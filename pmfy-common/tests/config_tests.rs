//! Configuration loading and graceful degradation tests
//!
//! Uses serial_test for tests that manipulate PMFY_CONFIG so they do not race.

use pmfy_common::config::{
    load_or_default, load_toml_config, resolve_config_path, write_default_config, write_toml_config,
    LoggingConfig, PipelineSettings, ServicesConfig, TomlConfig, CONFIG_PATH_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_write_then_load_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("pmfy.toml");

    let config = TomlConfig {
        logging: LoggingConfig {
            level: "debug".to_string(),
            file: Some(PathBuf::from("/var/log/pmfy.log")),
        },
        services: ServicesConfig {
            lastfm_api_key: Some("lastfm-key".to_string()),
            cover_art: false,
            ..Default::default()
        },
        pipeline: PipelineSettings {
            concurrency: 8,
            max_retries: 4,
            ..Default::default()
        },
    };

    write_toml_config(&config, &path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists());

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_default_config_file_loads_back_as_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config").join("pmfy.toml");

    write_default_config(&path).unwrap();

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, TomlConfig::default());
}

#[test]
fn test_default_config_keeps_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pmfy.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let err = write_default_config(&path).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(load_toml_config(&path).unwrap().logging.level, "debug");
}

#[test]
fn test_load_rejects_invalid_pipeline_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "[pipeline]\nconcurrency = 0\n").unwrap();

    let result = load_toml_config(&path);
    assert!(result.is_err());
}

#[test]
fn test_load_reports_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Parse"));
}

#[test]
fn test_explicit_missing_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.toml");

    assert!(load_or_default(Some(&path)).is_err());
}

#[test]
#[serial]
fn test_env_var_points_at_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("env.toml");
    std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

    env::set_var(CONFIG_PATH_ENV, &path);
    let resolved = resolve_config_path(None);
    let config = load_or_default(None).unwrap();
    env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(resolved, Some(path));
    assert_eq!(config.logging.level, "warn");
}

#[test]
#[serial]
fn test_unparseable_implicit_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("garbage.toml");
    std::fs::write(&path, "[[[").unwrap();

    env::set_var(CONFIG_PATH_ENV, &path);
    let config = load_or_default(None).unwrap();
    env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(config, TomlConfig::default());
}

//! Configuration loading tests
//!
//! Tests that touch XDG_CONFIG_HOME are marked #[serial] so they never race
//! on the process environment.

use ats_common::config::{
    load_toml_config, ConfigOverrides, SelectionLimits, SurveyConfig, TitleStrategy, TomlConfig,
};
use ats_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const FULL_TOML: &str = r#"
audio_root = "/srv/survey/audio"
data_dir = "/srv/survey/data"
port = 8080

[survey]
n_random_clips = 8
m_language_clips = 3
speed_variant_marker = "_fast"
title_strategy = "filename_derived"
session_ttl_hours = 6

[storage]
primary_enabled = false
fallback_file = "responses.jsonl"

[logging]
level = "debug"
"#;

#[test]
fn test_explicit_file_is_parsed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ats.toml");
    fs::write(&path, FULL_TOML).unwrap();

    let toml = load_toml_config(Some(&path)).unwrap();
    let config = SurveyConfig::resolve(&ConfigOverrides::default(), &toml);

    assert_eq!(config.audio_root, PathBuf::from("/srv/survey/audio"));
    assert_eq!(config.port, 8080);
    assert_eq!(
        config.limits,
        SelectionLimits {
            n_random_clips: 8,
            m_language_clips: 3
        }
    );
    assert_eq!(config.speed_variant_marker, "_fast");
    assert_eq!(config.title_strategy, TitleStrategy::FilenameDerived);
    assert_eq!(config.session_ttl_hours, 6);
    assert!(!config.primary_store_enabled);
    assert_eq!(
        config.fallback_path(),
        PathBuf::from("/srv/survey/data/responses.jsonl")
    );
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = load_toml_config(Some(&dir.path().join("missing.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[survey\nn_random_clips = ").unwrap();

    assert!(matches!(load_toml_config(Some(&path)), Err(Error::Config(_))));
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.toml");
    fs::write(&path, "[survey]\nm_language_clips = 0\n").unwrap();

    let toml = load_toml_config(Some(&path)).unwrap();
    let config = SurveyConfig::resolve(&ConfigOverrides::default(), &toml);

    assert_eq!(config.limits.m_language_clips, 0);
    assert_eq!(config.limits.n_random_clips, SelectionLimits::default().n_random_clips);
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_overrides_beat_toml() {
    let toml: TomlConfig = toml::from_str(FULL_TOML).unwrap();
    let overrides = ConfigOverrides {
        audio_root: Some(PathBuf::from("/cli/audio")),
        data_dir: None,
        bind: Some("0.0.0.0".to_string()),
        port: Some(9000),
    };

    let config = SurveyConfig::resolve(&overrides, &toml);
    assert_eq!(config.audio_root, PathBuf::from("/cli/audio"));
    assert_eq!(config.data_dir, PathBuf::from("/srv/survey/data"));
    assert_eq!(config.bind, "0.0.0.0");
    assert_eq!(config.port, 9000);
}

#[test]
#[serial]
fn test_default_location_is_discovered() {
    let dir = TempDir::new().unwrap();
    let ats_dir = dir.path().join("ats");
    fs::create_dir_all(&ats_dir).unwrap();
    fs::write(ats_dir.join("config.toml"), "port = 7001\n").unwrap();

    let previous = env::var("XDG_CONFIG_HOME").ok();
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let toml = load_toml_config(None).unwrap();

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    if cfg!(target_os = "linux") {
        assert_eq!(toml.port, Some(7001));
    }
}

#[test]
#[serial]
fn test_missing_default_location_yields_defaults() {
    let dir = TempDir::new().unwrap();

    let previous = env::var("XDG_CONFIG_HOME").ok();
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let result = load_toml_config(None);

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    // A system-wide /etc/ats/config.toml would legitimately win here
    if !PathBuf::from("/etc/ats/config.toml").exists() {
        assert_eq!(result.unwrap(), TomlConfig::default());
    }
}

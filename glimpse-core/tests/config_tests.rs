//! Integration tests for configuration system

use glimpse_core::config::{sample_config, ConfigFile, RetryPolicy};
use glimpse_core::error::GlimpseError;
use glimpse_core::types::PreviewParams;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_missing_file_gives_defaults() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let config = ConfigFile::load_from(temp_dir.path().join("absent.toml")).expect("Should load");

    assert_eq!(config.preview.params(), PreviewParams::default());
    assert!(config.host.socket_path.is_none());
}

#[test]
fn test_save_and_load_roundtrip() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = ConfigFile::default();
    config.preview.fps = 24;
    config.preview.width = 640;
    config.preview.height = 360;
    config.host.socket_path = Some(PathBuf::from("/run/user/1000/other.sock"));
    config.webrtc.ice_servers = vec!["stun:stun.example.org:3478".to_string()];
    config.webrtc.trickle_ice = false;
    config.retry.max_attempts = 3;

    config.save_to(path.clone()).expect("Should save");
    let loaded = ConfigFile::load_from(path).expect("Should load");

    assert_eq!(loaded.preview.params(), PreviewParams::new(24, 640, 360));
    assert_eq!(
        loaded.host.socket_path,
        Some(PathBuf::from("/run/user/1000/other.sock"))
    );
    assert_eq!(loaded.webrtc.ice_servers.len(), 1);
    assert!(!loaded.webrtc.trickle_ice);
    assert_eq!(loaded.retry.max_attempts, 3);
}

#[test]
fn test_sample_config_loads_from_disk() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, sample_config()).expect("Should write");

    let config = ConfigFile::load_from(path).expect("Should load");
    assert_eq!(config.preview.fps, 10);
    assert_eq!(config.retry.backoff_ms, 500);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[preview\nfps = ").expect("Should write");

    let err = ConfigFile::load_from(path).unwrap_err();
    assert!(matches!(err, GlimpseError::Config(_)));
}

#[test]
fn test_negative_size_rejected_on_load() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[preview]\nwidth = -1\n").expect("Should write");

    let err = ConfigFile::load_from(path).unwrap_err();
    assert!(err.to_string().contains("must be positive"));
}

#[test]
fn test_retry_policy_from_settings() {
    let mut config = ConfigFile::default();
    config.retry.max_attempts = 0;
    config.retry.backoff_ms = 100;

    let policy = RetryPolicy::from(&config.retry);
    assert_eq!(policy.max_attempts, 1);

    config.retry.max_attempts = 4;
    let policy = RetryPolicy::from(&config.retry);
    assert_eq!(policy.delay_before(1), Duration::ZERO);
    assert_eq!(policy.delay_before(2), Duration::from_millis(100));
    assert_eq!(policy.delay_before(4), Duration::from_millis(400));
}

#[test]
fn test_default_path_ends_in_glimpse_config() {
    let path = ConfigFile::default_path();
    assert!(path.ends_with("glimpse/config.toml"));
}

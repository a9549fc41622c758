// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use footscan::Config;
use footscan::app::CaptureMode;
use std::time::Duration;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("footscan-config-{}", uuid::Uuid::new_v4()))
        .join(name)
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.capture.min_images, 10);
    assert_eq!(config.capture.max_recording(), Duration::from_secs(30));
    assert_eq!(config.capture.default_mode, CaptureMode::Photo);
    assert_eq!(config.extraction.select, 5);
    assert_eq!(config.geometry.segments_x, 30);
    assert_eq!(config.geometry.segments_z, 60);
}

#[test]
fn test_config_save_and_load() {
    let path = temp_path("config.json");
    let mut config = Config::default();
    config.capture.min_images = 6;
    config.quality.brightness_min = 30.0;
    config.geometry.segments_z = 40;

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_partial_config_keeps_defaults() {
    let path = temp_path("partial.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ "capture": { "max_recording_secs": 12.5 } }"#).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.capture.max_recording(), Duration::from_secs_f64(12.5));
    assert_eq!(loaded.capture.min_images, 10);
    assert_eq!(loaded.quality, Config::default().quality);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_malformed_config_falls_back() {
    let path = temp_path("broken.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load_or_default(&path), Config::default());
    assert_eq!(
        Config::load_or_default(&path.with_file_name("missing.json")),
        Config::default()
    );

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_invalid_recording_cap_uses_default() {
    let mut config = Config::default();
    config.capture.max_recording_secs = -1.0;
    assert_eq!(config.capture.max_recording(), Duration::from_secs(30));
}

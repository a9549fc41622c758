// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use footscan::constants::{capture, extraction, file_formats, geometry, quality};

#[test]
fn test_brightness_window_is_ordered() {
    assert!(quality::BRIGHTNESS_MIN < quality::BRIGHTNESS_MAX);
    assert!(quality::QUICK_BLUR_THRESHOLD < quality::FULL_BLUR_THRESHOLD);
    let luma_sum = quality::LUMA_R + quality::LUMA_G + quality::LUMA_B;
    assert!((luma_sum - 1.0).abs() < 1e-6);
}

#[test]
fn test_extraction_oversamples() {
    assert!(extraction::SELECTED_FRAME_COUNT <= extraction::TARGET_FRAME_COUNT);
    assert_eq!(extraction::TARGET_FRAME_COUNT * extraction::OVERSAMPLE_FACTOR, 16);
}

#[test]
fn test_one_image_per_slot_minimum() {
    assert_eq!(capture::MIN_IMAGES, 10);
    assert!(capture::RECORDING_WATCHDOG_INTERVAL < capture::MAX_RECORDING_DURATION);
}

#[test]
fn test_geometry_defaults() {
    assert_eq!(geometry::MM_TO_UNITS, 0.1);
    assert!((geometry::DEFAULT_LENGTH_MM * geometry::MM_TO_UNITS - 26.0).abs() < 1e-4);
}

#[test]
fn test_file_format_detection() {
    assert!(file_formats::is_container_extension("webm"));
    assert!(file_formats::is_container_extension("MP4"));
    assert!(file_formats::is_mjpeg_extension("mjpg"));
    assert!(!file_formats::is_mjpeg_extension("webm"));
    assert!(!file_formats::is_container_extension("jpg"));
}

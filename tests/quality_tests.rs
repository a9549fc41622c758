// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the quality gate

mod common;

use common::{blurred_frame, flat_frame, sharp_frame};
use footscan::app::frame_processor::QualityIssue;
use footscan::app::frame_processor::quality::{analyze_frame, quick_sharpness_ok};
use footscan::app::frame_processor::QualityThresholds;

#[test]
fn test_dark_frame_is_rejected() {
    let result = analyze_frame(&flat_frame(15), &QualityThresholds::default());
    assert!(!result.passed);
    assert!(!result.brightness_ok);
    assert!(result.issues.contains(&QualityIssue::TooDark));
    assert_eq!(result.headline(), Some(QualityIssue::Blurry.message()));
}

#[test]
fn test_mid_grey_is_bright_enough_but_flat() {
    let result = analyze_frame(&flat_frame(128), &QualityThresholds::default());
    assert!(result.brightness_ok);
    assert!(!result.blur_ok);
    assert!(!result.contrast_ok);
    assert_eq!(result.issues, vec![QualityIssue::Blurry, QualityIssue::LowContrast]);
}

#[test]
fn test_sharp_checkerboard_passes() {
    let result = analyze_frame(&sharp_frame(), &QualityThresholds::default());
    assert!(result.passed, "{:?}", result);
    assert!(result.messages().is_empty());
    assert_eq!(result.headline(), None);
}

#[test]
fn test_blur_lowers_sharpness() {
    let thresholds = QualityThresholds::default();
    let sharp = analyze_frame(&sharp_frame(), &thresholds);
    let blurred = analyze_frame(&blurred_frame(), &thresholds);
    assert!(sharp.sharpness > blurred.sharpness);
    assert!(!blurred.blur_ok);
    assert!(!quick_sharpness_ok(&blurred_frame(), &thresholds));
}

#[test]
fn test_thresholds_are_configurable() {
    let thresholds = QualityThresholds {
        brightness_min: 10.0,
        ..QualityThresholds::default()
    };
    let result = analyze_frame(&flat_frame(15), &thresholds);
    assert!(result.brightness_ok);
}

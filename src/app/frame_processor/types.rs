// SPDX-License-Identifier: GPL-3.0-only

//! Quality analysis results
//!
//! [`QualityResult`] is the full-resolution verdict attached to every
//! captured still. [`LiveQualityIndicator`] is the ephemeral pair of flags
//! the monitor publishes every tick; it only drives warnings and the
//! [`CaptureLabel`] shown on the capture button.

use crate::constants::quality as defaults;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pass/fail thresholds for quality analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Full-resolution Laplacian energy must exceed this
    pub full_blur_min: f64,
    /// Quick-check Laplacian energy must exceed this
    pub quick_blur_min: f64,
    /// Mean luma must lie strictly inside (min, max)
    pub brightness_min: f32,
    pub brightness_max: f32,
    /// Luma range (max - min) must exceed this
    pub contrast_min: f32,
    /// Side of the centred quick-check window in pixels
    pub quick_window: u32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            full_blur_min: defaults::FULL_BLUR_THRESHOLD,
            quick_blur_min: defaults::QUICK_BLUR_THRESHOLD,
            brightness_min: defaults::BRIGHTNESS_MIN,
            brightness_max: defaults::BRIGHTNESS_MAX,
            contrast_min: defaults::CONTRAST_MIN,
            quick_window: defaults::QUICK_WINDOW,
        }
    }
}

impl QualityThresholds {
    /// Check a mean luma against the brightness window
    pub fn brightness_ok(&self, mean: f32) -> bool {
        mean > self.brightness_min && mean < self.brightness_max
    }
}

/// A failed quality check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    Blurry,
    TooDark,
    TooBright,
    LowContrast,
}

impl QualityIssue {
    /// Operator guidance for this issue
    pub fn message(&self) -> &'static str {
        match self {
            QualityIssue::Blurry => "Image is blurry. Hold the phone steady.",
            QualityIssue::TooDark => "Too dark. Improve lighting.",
            QualityIssue::TooBright => "Too bright. Reduce light exposure.",
            QualityIssue::LowContrast => "Low contrast. Ensure foot is on a contrasting background.",
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Full-resolution analysis of one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    /// Mean squared Laplacian response, higher is sharper
    pub sharpness: f64,
    pub blur_ok: bool,
    /// Mean luma on an 8-bit scale
    pub brightness: f32,
    pub brightness_ok: bool,
    /// Luma range, max minus min
    pub contrast: f32,
    pub contrast_ok: bool,
    /// All checks passed
    pub passed: bool,
    /// Failed checks in blur, brightness, contrast order
    pub issues: Vec<QualityIssue>,
}

impl QualityResult {
    /// Operator messages for every failed check
    pub fn messages(&self) -> Vec<&'static str> {
        self.issues.iter().map(QualityIssue::message).collect()
    }

    /// The message shown when only one line fits
    pub fn headline(&self) -> Option<&'static str> {
        self.issues.first().map(QualityIssue::message)
    }
}

/// Live flags from the latest monitor tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveQualityIndicator {
    pub brightness_ok: bool,
    pub sharpness_ok: bool,
}

impl Default for LiveQualityIndicator {
    /// No warnings until the first tick has run
    fn default() -> Self {
        Self {
            brightness_ok: true,
            sharpness_ok: true,
        }
    }
}

impl LiveQualityIndicator {
    /// Capture button label for these flags
    ///
    /// Low light wins over blur when both fail.
    pub fn label(&self) -> CaptureLabel {
        if !self.brightness_ok {
            CaptureLabel::CaptureAnywayLowLight
        } else if !self.sharpness_ok {
            CaptureLabel::CaptureAnywayBlurry
        } else {
            CaptureLabel::CapturePhoto
        }
    }
}

/// Label of the capture action, recorded with each image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureLabel {
    #[default]
    CapturePhoto,
    CaptureAnywayLowLight,
    CaptureAnywayBlurry,
}

impl CaptureLabel {
    pub fn text(&self) -> &'static str {
        match self {
            CaptureLabel::CapturePhoto => "Capture Photo",
            CaptureLabel::CaptureAnywayLowLight => "Capture Anyway (Low Light)",
            CaptureLabel::CaptureAnywayBlurry => "Capture Anyway (Blurry)",
        }
    }

    /// True when the operator overrode a live warning
    pub fn is_override(&self) -> bool {
        !matches!(self, CaptureLabel::CapturePhoto)
    }
}

impl fmt::Display for CaptureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

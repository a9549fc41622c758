// SPDX-License-Identifier: GPL-3.0-only

//! Frame quality analysis
//!
//! Every check works on luma (`0.299R + 0.587G + 0.114B`). Sharpness is the
//! mean squared response of the 4-neighbour Laplacian over interior pixels:
//!
//! ```text
//!        [ 0  1  0 ]
//!   L =  [ 1 -4  1 ]
//!        [ 0  1  0 ]
//! ```
//!
//! Three entry points share it:
//! - [`analyze_frame`]: full resolution, run on every captured still
//! - [`quick_sharpness_ok`]: centred window, cheap reject during extraction
//!   and on the live monitor
//! - [`sharpness_score`]: 200×150 downsample, ranks extraction candidates

use crate::app::frame_processor::types::{
    LiveQualityIndicator, QualityIssue, QualityResult, QualityThresholds,
};
use crate::backends::camera::types::CameraFrame;
use crate::constants::{extraction, quality as quality_consts};
use crate::media::scaler;
use tracing::trace;

/// Mean squared Laplacian response over the interior of a luma plane
///
/// Planes narrower or shorter than 3 pixels have no interior and score 0.
pub fn laplacian_energy(luma: &[f32], width: usize, height: usize) -> f64 {
    if width < 3 || height < 3 || luma.len() < width * height {
        return 0.0;
    }

    let mut sum = 0.0f64;
    for y in 1..height - 1 {
        let row = y * width;
        for x in 1..width - 1 {
            let i = row + x;
            let lap = luma[i - 1] + luma[i + 1] + luma[i - width] + luma[i + width] - 4.0 * luma[i];
            sum += (lap as f64) * (lap as f64);
        }
    }

    sum / ((width - 2) * (height - 2)) as f64
}

/// Mean of every `stride`-th luma sample
pub fn mean_luma(luma: &[f32], stride: usize) -> f32 {
    let stride = stride.max(1);
    let (sum, count) = luma
        .iter()
        .step_by(stride)
        .fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64) as f32
    }
}

/// Full-resolution blur, brightness and contrast analysis
pub fn analyze_frame(frame: &CameraFrame, thresholds: &QualityThresholds) -> QualityResult {
    if frame.validate().is_err() {
        return QualityResult {
            sharpness: 0.0,
            blur_ok: false,
            brightness: 0.0,
            brightness_ok: false,
            contrast: 0.0,
            contrast_ok: false,
            passed: false,
            issues: vec![QualityIssue::Blurry, QualityIssue::TooDark, QualityIssue::LowContrast],
        };
    }

    let luma = scaler::frame_luma(frame);
    let sharpness = laplacian_energy(&luma, frame.width as usize, frame.height as usize);
    let brightness = mean_luma(&luma, 1);
    let (min, max) = luma
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let contrast = max - min;

    let blur_ok = sharpness > thresholds.full_blur_min;
    let brightness_ok = thresholds.brightness_ok(brightness);
    let contrast_ok = contrast > thresholds.contrast_min;

    let mut issues = Vec::new();
    if !blur_ok {
        issues.push(QualityIssue::Blurry);
    }
    if brightness <= thresholds.brightness_min {
        issues.push(QualityIssue::TooDark);
    } else if brightness >= thresholds.brightness_max {
        issues.push(QualityIssue::TooBright);
    }
    if !contrast_ok {
        issues.push(QualityIssue::LowContrast);
    }

    trace!(sharpness, brightness, contrast, "Analyzed frame");

    QualityResult {
        sharpness,
        blur_ok,
        brightness,
        brightness_ok,
        contrast,
        contrast_ok,
        passed: blur_ok && brightness_ok && contrast_ok,
        issues,
    }
}

/// Laplacian energy of the centred `window`×`window` region
///
/// The window shrinks to the frame on small frames.
pub fn quick_sharpness(frame: &CameraFrame, window: u32) -> f64 {
    if frame.validate().is_err() {
        return 0.0;
    }
    let w = window.min(frame.width);
    let h = window.min(frame.height);
    let x0 = (frame.width - w) / 2;
    let y0 = (frame.height - h) / 2;

    let luma = scaler::frame_luma_window(frame, x0, y0, w, h);
    laplacian_energy(&luma, w as usize, h as usize)
}

/// Cheap sharpness gate
pub fn quick_sharpness_ok(frame: &CameraFrame, thresholds: &QualityThresholds) -> bool {
    quick_sharpness(frame, thresholds.quick_window) > thresholds.quick_blur_min
}

/// Ranking score: Laplacian energy of a 200×150 downsample
pub fn sharpness_score(frame: &CameraFrame) -> f64 {
    if frame.validate().is_err() {
        return 0.0;
    }
    let (w, h) = (extraction::SCORE_WIDTH, extraction::SCORE_HEIGHT);
    let rgba = scaler::downsample_rgba(frame, w, h);
    let luma = scaler::rgba_to_luma(&rgba);
    laplacian_energy(&luma, w as usize, h as usize)
}

/// Live flags from an already downsampled RGBA buffer
///
/// Brightness samples every 4th pixel; sharpness uses the centred window of
/// the downsample. `None` when the buffer is shorter than `width × height`
/// pixels.
pub fn evaluate_live(
    rgba: &[u8],
    width: u32,
    height: u32,
    thresholds: &QualityThresholds,
) -> Option<LiveQualityIndicator> {
    let pixels = width as usize * height as usize;
    if pixels == 0 || rgba.len() < pixels * 4 {
        return None;
    }
    let luma = scaler::rgba_to_luma(&rgba[..pixels * 4]);
    let brightness = mean_luma(&luma, quality_consts::BRIGHTNESS_PIXEL_STRIDE);

    let w = thresholds.quick_window.min(width) as usize;
    let h = thresholds.quick_window.min(height) as usize;
    let x0 = (width as usize - w) / 2;
    let y0 = (height as usize - h) / 2;
    let mut window = Vec::with_capacity(w * h);
    for y in y0..y0 + h {
        let start = y * width as usize + x0;
        window.extend_from_slice(&luma[start..start + w]);
    }
    let sharpness = laplacian_energy(&window, w, h);

    trace!(brightness, sharpness, "Live quality sample");

    Some(LiveQualityIndicator {
        brightness_ok: thresholds.brightness_ok(brightness),
        sharpness_ok: sharpness > thresholds.quick_blur_min,
    })
}

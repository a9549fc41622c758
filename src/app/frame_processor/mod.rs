// SPDX-License-Identifier: GPL-3.0-only

//! Frame quality processing
//!
//! Grades frames for the capture flow: full-resolution checks on stills,
//! quick checks and ranking scores for extraction, and a live monitor that
//! drives operator warnings.

pub mod tasks;
pub mod types;

pub use tasks::quality;
pub use tasks::{MonitorSettings, QualityMonitor};
pub use types::{CaptureLabel, LiveQualityIndicator, QualityIssue, QualityResult, QualityThresholds};

// SPDX-License-Identifier: GPL-3.0-only

//! Frame analysis tasks
//!
//! - [`quality`]: blur, brightness and contrast scoring
//! - [`quality_monitor`]: periodic live sampling of a frame source

pub mod quality;
pub mod quality_monitor;

pub use quality_monitor::{MonitorSettings, QualityMonitor};

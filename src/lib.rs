// SPDX-License-Identifier: GPL-3.0-only

//! footscan - guided foot-scan capture and foot model generation
//!
//! # Architecture
//!
//! - [`app`]: guided capture controller, live quality monitor and scan hand-off
//! - [`backends`]: camera abstraction with GStreamer and virtual backends
//! - [`media`]: scaling, JPEG/MJPEG encoding and seekable take decoding
//! - [`pipelines`]: photo capture, video recording, frame extraction and
//!   the parametric foot model with GLB export
//! - [`config`]: site configuration
//!
//! # Example
//!
//! ```ignore
//! use footscan::{FootMeasurements, FootModelGenerator, ColorMode};
//!
//! let feet = FootModelGenerator::default()
//!     .generate_pair(&FootMeasurements::default(), ColorMode::Pressure)?;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;

// Re-export commonly used types
pub use app::{CaptureController, CaptureSlot, CaptureStep, QualityMonitor, QualityResult, ScanSubmission};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use pipelines::foot_model::{
    ColorMode, FootGeometry, FootMeasurements, FootModelGenerator, ScanRecord,
};
pub use pipelines::video::FrameExtractor;

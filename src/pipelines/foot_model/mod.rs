// SPDX-License-Identifier: GPL-3.0-only

//! Parametric foot model
//!
//! ```text
//! ScanRecord ──▶ FootMeasurements ──▶ FootModelGenerator ──▶ FootGeometry ×2 ──▶ GLB
//!                                      (geometry + pressure)
//! ```
//!
//! Generation is pure and synchronous; only the file export goes through
//! a blocking task.

pub mod geometry;
pub mod gltf_export;
pub mod measurements;
pub mod pressure;

pub use geometry::{
    ColorMode, FootGeometry, FootModelGenerator, GeometryParams, GuideKind, MeasurementGuide,
};
pub use gltf_export::{build_glb, export_glb};
pub use measurements::{ArchType, FootMeasurements, Pronation, ScanRecord, SideMeasurements};
pub use pressure::{PressureParams, pressure_color};

// SPDX-License-Identifier: GPL-3.0-only

//! Camera backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          Capture controller / CLI           │
//! └────────────────────┬────────────────────────┘
//!                      │ CameraDevice / FrameSource / Recorder
//! ┌────────────────────┴────────────────────────┐
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │   GStreamer      │  │ Virtual camera  │  │
//! │  │ (v4l2src, webm)  │  │ (in-memory)     │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: device traits, frame types and the GStreamer backend
//! - [`virtual_camera`]: scripted device for simulation and tests

pub mod camera;
pub mod virtual_camera;

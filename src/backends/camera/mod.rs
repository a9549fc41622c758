// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! The scanning core never touches a capture API directly. It talks to three
//! small traits:
//!
//! ```text
//! ┌──────────────┐  start(facing)  ┌─────────────┐  create_recorder()  ┌──────────┐
//! │ CameraDevice │ ──────────────▶ │ FrameSource │ ──────────────────▶ │ Recorder │
//! └──────────────┘                 └─────────────┘                     └──────────┘
//!                                   grab_frame() -> CameraFrame         start() / stop() -> RecordedTake
//! ```
//!
//! Implementations: [`gst_camera::GstCameraDevice`] for real hardware and
//! [`crate::backends::virtual_camera::VirtualCamera`] for simulation and tests.

pub mod frame_loop;
pub mod gst_camera;
pub mod types;

pub use types::*;

use std::sync::{Arc, Mutex};

/// A camera that can be opened in a given facing mode
pub trait CameraDevice: Send {
    /// Human readable device name, recorded in scan metadata
    fn name(&self) -> String;

    /// Open the camera and start streaming
    ///
    /// The returned source owns the device until it is dropped or stopped.
    fn start(&mut self, facing: FacingMode) -> BackendResult<Box<dyn FrameSource>>;
}

/// A live stream of frames from an opened camera
pub trait FrameSource: Send {
    /// Negotiated stream resolution
    fn resolution(&self) -> (u32, u32);

    /// Grab the most recent frame at full resolution
    fn grab_frame(&mut self) -> BackendResult<CameraFrame>;

    /// Create a recorder fed by this stream
    fn create_recorder(&mut self) -> BackendResult<Box<dyn Recorder>>;

    /// Release the device. Idempotent; also called on drop.
    fn stop(&mut self);
}

/// Records a bounded video take from a frame source
pub trait Recorder: Send {
    /// Begin recording
    fn start(&mut self) -> BackendResult<()>;

    /// Finish recording and hand back whatever was captured
    ///
    /// Stopping early is not an error: the bytes recorded so far are returned.
    fn stop(&mut self) -> BackendResult<RecordedTake>;

    /// Check if currently recording
    fn is_recording(&self) -> bool;
}

/// Frame source shared between the operator path and the quality monitor
pub type SharedFrameSource = Arc<Mutex<Box<dyn FrameSource>>>;

// SPDX-License-Identifier: GPL-3.0-only

//! MJPEG take writer
//!
//! An MJPEG take is a plain concatenation of baseline JPEG images at a fixed
//! frame rate, the same elementary stream a UVC camera emits. The matching
//! reader lives in [`crate::media::decoders::mjpeg`].

use super::jpeg::encode_frame_jpeg;
use crate::backends::camera::types::{CameraFrame, RecordedTake, TakeContainer};
use crate::errors::PhotoError;
use std::time::Duration;

/// Accumulates frames into an MJPEG byte stream
#[derive(Debug)]
pub struct MjpegWriter {
    data: Vec<u8>,
    frames: usize,
    fps: f64,
    quality: u8,
}

impl MjpegWriter {
    pub fn new(fps: f64, quality: u8) -> Self {
        Self {
            data: Vec::new(),
            frames: 0,
            fps,
            quality,
        }
    }

    /// Append one frame
    pub fn push(&mut self, frame: &CameraFrame) -> Result<(), PhotoError> {
        let jpeg = encode_frame_jpeg(frame, self.quality)?;
        self.data.extend_from_slice(&jpeg);
        self.frames += 1;
        Ok(())
    }

    /// Frames written so far
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Finish the stream
    pub fn finish(self, recorded_for: Duration, auto_stopped: bool) -> RecordedTake {
        RecordedTake {
            data: self.data,
            container: TakeContainer::Mjpeg { fps: self.fps },
            recorded_for,
            auto_stopped,
        }
    }
}

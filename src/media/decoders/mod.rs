// SPDX-License-Identifier: GPL-3.0-only

//! Random-access decoding of recorded takes
//!
//! Frame extraction needs "the frame at time t" rather than a linear stream.
//! Both take containers are exposed through [`SeekableVideo`]:
//!
//! - [`mjpeg::MjpegReader`]: in-memory index of concatenated JPEG images
//! - [`pipeline::GstTakeDecoder`]: GStreamer `decodebin` with accurate seeks

pub mod mjpeg;
pub mod pipeline;

use crate::backends::camera::types::{CameraFrame, RecordedTake, TakeContainer};
use crate::errors::ExtractionError;

/// A decoded take that can be sampled at arbitrary timestamps
pub trait SeekableVideo: Send {
    /// Total duration in seconds
    fn duration(&self) -> f64;

    /// Decode the frame shown at `secs`
    ///
    /// The returned frame owns its pixels and carries its position.
    fn frame_at(&mut self, secs: f64) -> Result<CameraFrame, ExtractionError>;
}

/// Open a recorded take for seeking
pub fn open_take(take: &RecordedTake) -> Result<Box<dyn SeekableVideo>, ExtractionError> {
    if take.is_empty() {
        return Err(ExtractionError::EmptyTake);
    }

    match take.container {
        TakeContainer::Mjpeg { fps } => Ok(Box::new(mjpeg::MjpegReader::new(&take.data, fps)?)),
        TakeContainer::Container => Ok(Box::new(pipeline::GstTakeDecoder::open(&take.data)?)),
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! MJPEG take reader
//!
//! Splits a byte stream of back-to-back JPEG images on SOI/EOI markers and
//! decodes individual images on demand.

use super::SeekableVideo;
use crate::backends::camera::types::CameraFrame;
use crate::constants::extraction::DEFAULT_MJPEG_FPS;
use crate::errors::ExtractionError;
use std::ops::Range;
use std::time::Duration;
use tracing::debug;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Seekable view of an MJPEG byte stream
pub struct MjpegReader {
    data: Vec<u8>,
    frames: Vec<Range<usize>>,
    fps: f64,
}

impl MjpegReader {
    /// Index the images in `data`
    ///
    /// A non-positive or non-finite `fps` falls back to the default rate.
    pub fn new(data: &[u8], fps: f64) -> Result<Self, ExtractionError> {
        let frames = split_images(data);
        if frames.is_empty() {
            return Err(ExtractionError::DecodeFailed(
                "no JPEG images in MJPEG stream".into(),
            ));
        }

        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            DEFAULT_MJPEG_FPS
        };

        debug!(frames = frames.len(), fps, "Indexed MJPEG take");

        Ok(Self {
            data: data.to_vec(),
            frames,
            fps,
        })
    }

    /// Number of images in the stream
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn index_at(&self, secs: f64) -> usize {
        let index = (secs.max(0.0) * self.fps).floor() as usize;
        index.min(self.frames.len() - 1)
    }
}

impl SeekableVideo for MjpegReader {
    fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    fn frame_at(&mut self, secs: f64) -> Result<CameraFrame, ExtractionError> {
        let index = self.index_at(secs);
        let bytes = &self.data[self.frames[index].clone()];

        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
            .map_err(|e| ExtractionError::DecodeFailed(format!("frame {}: {}", index, e)))?
            .to_rgba8();

        let position = Duration::from_secs_f64(index as f64 / self.fps);
        Ok(CameraFrame::from_image(&image).with_position(position))
    }
}

/// Byte ranges of each complete SOI..EOI image
fn split_images(data: &[u8]) -> Vec<Range<usize>> {
    let mut frames = Vec::new();
    let mut start = None;
    let mut i = 0;

    while i + 1 < data.len() {
        let pair = [data[i], data[i + 1]];
        if start.is_none() && pair == SOI {
            start = Some(i);
            i += 2;
            continue;
        }
        if pair == EOI
            && let Some(s) = start.take()
        {
            frames.push(s..i + 2);
            i += 2;
            continue;
        }
        i += 1;
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::encoders::MjpegWriter;

    fn solid_frame(value: u8) -> CameraFrame {
        CameraFrame::from_rgba(8, 8, vec![value; 8 * 8 * 4])
    }

    fn take_of(values: &[u8], fps: f64) -> Vec<u8> {
        let mut writer = MjpegWriter::new(fps, 95);
        for &v in values {
            writer.push(&solid_frame(v)).unwrap();
        }
        writer.finish(Duration::from_secs(1), false).data
    }

    #[test]
    fn test_split_ignores_garbage() {
        let mut data = vec![0x00, 0x12];
        data.extend_from_slice(&[0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9]);
        data.extend_from_slice(&[0xAA]);
        data.extend_from_slice(&[0xFF, 0xD8, 4, 0xFF, 0xD9]);
        assert_eq!(split_images(&data), vec![2..9, 10..15]);
    }

    #[test]
    fn test_duration_and_positions() {
        let data = take_of(&[10, 120, 240, 60], 4.0);
        let mut reader = MjpegReader::new(&data, 4.0).unwrap();
        assert_eq!(reader.frame_count(), 4);
        assert!((reader.duration() - 1.0).abs() < 1e-9);

        let frame = reader.frame_at(0.5).unwrap();
        assert_eq!(frame.position, Some(Duration::from_millis(500)));
        let v = frame.rgb_at(4, 4)[0];
        assert!((235..=245).contains(&v), "got {}", v);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let data = take_of(&[10, 240], 2.0);
        let mut reader = MjpegReader::new(&data, 2.0).unwrap();
        let last = reader.frame_at(99.0).unwrap();
        assert_eq!(last.position, Some(Duration::from_millis(500)));
        let first = reader.frame_at(-3.0).unwrap();
        assert_eq!(first.position, Some(Duration::ZERO));
    }

    #[test]
    fn test_rejects_stream_without_images() {
        assert!(MjpegReader::new(&[1, 2, 3], 30.0).is_err());
    }
}

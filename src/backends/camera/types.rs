// SPDX-License-Identifier: GPL-3.0-only

//! Frames, takes and errors shared by every camera backend

use gstreamer::buffer::{MappedBuffer, Readable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pixel bytes of a frame
///
/// Live frames keep their GStreamer buffer mapped (`Mapped`) until the last
/// clone is dropped. Decoded and synthetic frames own a plain copy.
#[derive(Clone)]
pub enum FrameData {
    Copied(Arc<[u8]>),
    Mapped(Arc<MappedBuffer<Readable>>),
}

impl FrameData {
    pub fn from_mapped_buffer(buffer: MappedBuffer<Readable>) -> Self {
        Self::Mapped(Arc::new(buffer))
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(data: Vec<u8>) -> Self {
        Self::Copied(data.into())
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Copied(bytes) => bytes,
            Self::Mapped(buffer) => buffer.as_slice(),
        }
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        &**self
    }
}

impl fmt::Debug for FrameData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Copied(_) => "copied",
            Self::Mapped(_) => "mapped",
        };
        write!(f, "FrameData({} bytes, {})", self.len(), kind)
    }
}

/// Which way the camera points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointing away from the operator
    #[default]
    Environment,
    /// Front camera, pointing at the operator
    User,
}

impl FacingMode {
    /// The opposite facing mode
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

/// Pixel layouts understood by the analysis code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// R G B A, 4 bytes per pixel
    RGBA,
    /// B G R A, 4 bytes per pixel
    BGRA,
    /// R G B, 3 bytes per pixel
    RGB24,
    /// Single 8-bit luma channel
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::RGBA | Self::BGRA => 4,
            Self::RGB24 => 3,
            Self::Gray8 => 1,
        }
    }

    /// Convert to a GStreamer video/x-raw format string
    pub fn to_gst_format_string(&self) -> &'static str {
        match self {
            Self::RGBA => "RGBA",
            Self::BGRA => "BGRA",
            Self::RGB24 => "RGB",
            Self::Gray8 => "GRAY8",
        }
    }

    /// Parse format from GStreamer format string
    pub fn from_gst_format(format: &str) -> Option<Self> {
        match format {
            "RGBA" | "RGBx" => Some(Self::RGBA),
            "BGRA" | "BGRx" => Some(Self::BGRA),
            "RGB" => Some(Self::RGB24),
            "GRAY8" | "GREY" | "Y8" => Some(Self::Gray8),
            _ => None,
        }
    }
}

/// A single frame from a camera or a decoded take
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: FrameData,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// When the frame was captured or decoded
    pub captured_at: Instant,
    /// Position inside a recorded take, if the frame came from one
    pub position: Option<Duration>,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: FrameData::from(data),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
            position: None,
        }
    }

    /// Copy an `image` buffer into a frame
    pub fn from_image(image: &image::RgbaImage) -> Self {
        Self::from_rgba(image.width(), image.height(), image.as_raw().clone())
    }

    /// Tag the frame with its position inside a take
    pub fn with_position(mut self, position: Duration) -> Self {
        self.position = Some(position);
        self
    }

    /// Check that the buffer covers every declared row
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("empty frame {}x{}", self.width, self.height));
        }
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        if (self.stride as usize) < row_bytes {
            return Err(format!(
                "stride {} shorter than row of {} bytes",
                self.stride, row_bytes
            ));
        }
        let needed = self.stride as usize * (self.height as usize - 1) + row_bytes;
        if self.data.len() < needed {
            return Err(format!(
                "buffer holds {} bytes, {}x{} needs {}",
                self.data.len(),
                self.width,
                self.height,
                needed
            ));
        }
        Ok(())
    }

    /// Read one pixel as RGB
    ///
    /// Callers must stay inside the frame and call [`Self::validate`] first.
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let bpp = self.format.bytes_per_pixel();
        let i = y as usize * self.stride as usize + x as usize * bpp;
        let d = &self.data;
        match self.format {
            PixelFormat::RGBA | PixelFormat::RGB24 => [d[i], d[i + 1], d[i + 2]],
            PixelFormat::BGRA => [d[i + 2], d[i + 1], d[i]],
            PixelFormat::Gray8 => [d[i], d[i], d[i]],
        }
    }

    /// Repack into a tightly packed RGB buffer for encoding
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                out.extend_from_slice(&self.rgb_at(x, y));
            }
        }
        out
    }

    /// Convert to a frame with copied data
    ///
    /// Mapped GStreamer buffers pin pipeline memory. Copy before handing a
    /// frame to work that may outlive the pipeline.
    pub fn to_copied(&self) -> Self {
        let data = match &self.data {
            FrameData::Copied(data) => FrameData::Copied(Arc::clone(data)),
            FrameData::Mapped(buffer) => {
                let slice: &[u8] = buffer.as_ref();
                FrameData::Copied(Arc::from(slice))
            }
        };

        Self {
            data,
            ..self.clone()
        }
    }
}

/// Container of a recorded take
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TakeContainer {
    /// WebM/Matroska/MP4, decoded through GStreamer
    Container,
    /// Back-to-back JPEG images at a fixed frame rate
    Mjpeg { fps: f64 },
}

/// Encoded bytes of one video take
#[derive(Debug, Clone)]
pub struct RecordedTake {
    pub data: Vec<u8>,
    pub container: TakeContainer,
    /// Wall-clock recording time
    pub recorded_for: Duration,
    /// True when the take was cut by the recording cap
    pub auto_stopped: bool,
}

impl RecordedTake {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Why a camera operation failed
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    PermissionDenied(String),
    DeviceNotFound(String),
    /// In use by another process
    Busy(String),
    InitializationFailed(String),
    /// The device went away mid-session
    Disconnected,
    RecordingInProgress,
    NoRecordingInProgress,
    NoFrameAvailable,
    IoError(String),
    Other(String),
}

impl BackendError {
    /// Operator-facing message
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(_) => {
                "Camera permission denied. Allow camera access and retry.".into()
            }
            Self::DeviceNotFound(_) => "No camera found. Connect a camera and retry.".into(),
            Self::Busy(_) => "Camera is in use by another application. Close it and retry.".into(),
            other => format!("Camera error: {}. Retry to reopen the camera.", other),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied(detail) => write!(f, "camera access refused ({})", detail),
            Self::DeviceNotFound(detail) => write!(f, "no such camera ({})", detail),
            Self::Busy(detail) => write!(f, "camera busy ({})", detail),
            Self::InitializationFailed(detail) => write!(f, "pipeline setup failed: {}", detail),
            Self::Disconnected => f.write_str("camera disconnected"),
            Self::RecordingInProgress => f.write_str("a take is already being recorded"),
            Self::NoRecordingInProgress => f.write_str("no take is being recorded"),
            Self::NoFrameAvailable => f.write_str("no frame arrived in time"),
            Self::IoError(detail) => write!(f, "I/O error: {}", detail),
            Self::Other(detail) => f.write_str(detail),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_short_buffer() {
        let frame = CameraFrame::from_rgba(4, 4, vec![0; 4 * 4 * 4 - 1]);
        assert!(frame.validate().is_err());

        let frame = CameraFrame::from_rgba(4, 4, vec![0; 4 * 4 * 4]);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_frame_data_as_byte_slice() {
        fn byte_len<T: AsRef<[u8]> + Send + 'static>(data: T) -> usize {
            data.as_ref().len()
        }
        let data = FrameData::from(vec![7u8; 12]);
        assert_eq!(byte_len(data.clone()), 12);
        assert_eq!(data.as_ref()[0], 7);
    }

    #[test]
    fn test_rgb_at_respects_format_and_stride() {
        // 2x2 BGRA with 4 bytes of row padding
        let data = vec![
            1, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, 0, //
            7, 8, 9, 255, 10, 11, 12, 255, 0, 0, 0, 0,
        ];
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: FrameData::from(data),
            format: PixelFormat::BGRA,
            stride: 12,
            captured_at: Instant::now(),
            position: None,
        };
        assert!(frame.validate().is_ok());
        assert_eq!(frame.rgb_at(0, 0), [3, 2, 1]);
        assert_eq!(frame.rgb_at(1, 1), [12, 11, 10]);
        assert_eq!(frame.to_rgb8().len(), 12);
    }

    #[test]
    fn test_facing_mode_toggle() {
        assert_eq!(FacingMode::default(), FacingMode::Environment);
        assert_eq!(FacingMode::Environment.toggled(), FacingMode::User);
        assert_eq!(FacingMode::User.toggled(), FacingMode::Environment);
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let denied = BackendError::PermissionDenied("x".into()).user_message();
        let missing = BackendError::DeviceNotFound("x".into()).user_message();
        let busy = BackendError::Busy("x".into()).user_message();
        assert_ne!(denied, missing);
        assert_ne!(missing, busy);
        assert!(denied.contains("permission"));
    }

    #[test]
    fn test_gst_format_roundtrip_names() {
        assert_eq!(PixelFormat::from_gst_format("BGRx"), Some(PixelFormat::BGRA));
        assert_eq!(PixelFormat::RGB24.to_gst_format_string(), "RGB");
        assert_eq!(PixelFormat::from_gst_format("NV12"), None);
    }
}

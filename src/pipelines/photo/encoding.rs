// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! Turns captured frames into JPEG bytes, either inline or on a blocking
//! worker, and writes encoded images to disk for the command line tools.

use crate::backends::camera::types::CameraFrame;
use crate::constants::capture::PHOTO_JPEG_QUALITY;
use crate::errors::PhotoError;
use crate::media::encoders::encode_frame_jpeg;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Encoded image data ready for hand-off
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// JPEG photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: u8,
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(PHOTO_JPEG_QUALITY)
    }
}

impl PhotoEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode on the calling thread
    pub fn encode_sync(&self, frame: &CameraFrame) -> Result<EncodedImage, PhotoError> {
        let data = encode_frame_jpeg(frame, self.quality)?;
        debug!(size = data.len(), quality = self.quality, "Encoding complete");
        Ok(EncodedImage {
            data,
            width: frame.width,
            height: frame.height,
        })
    }

    /// Encode on a blocking worker
    pub async fn encode(&self, frame: Arc<CameraFrame>) -> Result<EncodedImage, PhotoError> {
        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode_sync(&frame))
            .await
            .map_err(|e| PhotoError::EncodingFailed(format!("Encoding task error: {}", e)))?
    }

    /// Write encoded bytes to `dir/file_name`
    pub async fn save(
        encoded: &EncodedImage,
        dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, PhotoError> {
        let path = dir.join(file_name);
        let data = encoded.data.clone();
        let target = path.clone();

        tokio::task::spawn_blocking(move || std::fs::write(&target, &data))
            .await
            .map_err(|e| PhotoError::SaveFailed(format!("Save task error: {}", e)))??;

        info!(path = %path.display(), "Image saved");
        Ok(path)
    }
}

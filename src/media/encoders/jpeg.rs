// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding of camera frames

use crate::backends::camera::types::CameraFrame;
use crate::errors::PhotoError;

/// Encode a frame as baseline JPEG at the given quality (1-100)
pub fn encode_frame_jpeg(frame: &CameraFrame, quality: u8) -> Result<Vec<u8>, PhotoError> {
    frame.validate().map_err(PhotoError::InvalidFrame)?;
    let rgb = frame.to_rgb8();

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100));

    encoder
        .encode(&rgb, frame.width, frame.height, image::ExtendedColorType::Rgb8)
        .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

    Ok(buffer)
}

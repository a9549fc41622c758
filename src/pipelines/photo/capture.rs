// SPDX-License-Identifier: GPL-3.0-only

//! Still photo capture
//!
//! Grabs one full-resolution frame, grades it and encodes it. The source
//! lock is held only for the grab itself so the live monitor keeps running.

use super::encoding::PhotoEncoder;
use crate::app::frame_processor::quality::analyze_frame;
use crate::app::frame_processor::{CaptureLabel, QualityThresholds};
use crate::app::state::CaptureSlot;
use crate::app::submission::{CapturedImage, ImageSource};
use crate::backends::camera::SharedFrameSource;
use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame};
use crate::errors::PhotoError;
use tracing::{debug, info};

/// Photo capture handler
pub struct PhotoCapture;

impl PhotoCapture {
    /// Grab the latest frame at full resolution
    ///
    /// The returned frame owns its pixels and no longer pins camera buffers.
    pub fn grab(source: &SharedFrameSource) -> BackendResult<CameraFrame> {
        let frame = {
            let mut guard = source
                .lock()
                .map_err(|_| BackendError::Other("Frame source lock poisoned".into()))?;
            guard.grab_frame()?
        };

        debug!(
            width = frame.width,
            height = frame.height,
            format = ?frame.format,
            "Frame captured from source"
        );
        Ok(frame.to_copied())
    }

    /// Grade and encode a grabbed frame into a captured image
    pub fn finish(
        frame: &CameraFrame,
        slot: CaptureSlot,
        label: CaptureLabel,
        thresholds: &QualityThresholds,
        encoder: &PhotoEncoder,
    ) -> Result<CapturedImage, PhotoError> {
        frame.validate().map_err(PhotoError::InvalidFrame)?;

        let quality = analyze_frame(frame, thresholds);
        let encoded = encoder.encode_sync(frame)?;

        info!(
            %slot,
            passed = quality.passed,
            sharpness = quality.sharpness,
            brightness = quality.brightness,
            label = %label,
            "Photo captured"
        );

        Ok(CapturedImage {
            id: uuid::Uuid::new_v4(),
            slot,
            jpeg: encoded.data,
            width: encoded.width,
            height: encoded.height,
            captured_at: chrono::Utc::now(),
            quality,
            label,
            source: ImageSource::Photo,
        })
    }
}

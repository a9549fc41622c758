// SPDX-License-Identifier: GPL-3.0-only

//! Captured images and the finished scan hand-off

use crate::app::frame_processor::{CaptureLabel, QualityResult};
use crate::app::state::{Angle, CaptureSlot, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// How an image was acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ImageSource {
    /// Single still grab
    Photo,
    /// Frame selected from a video take
    VideoFrame {
        #[serde(with = "duration_millis")]
        position: Duration,
    },
}

/// One JPEG-encoded image for a (side, angle) slot
///
/// Immutable once created. The encoded bytes are the only payload handed to
/// storage.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub id: Uuid,
    pub slot: CaptureSlot,
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    pub quality: QualityResult,
    /// Capture button label in force when the image was taken
    pub label: CaptureLabel,
    pub source: ImageSource,
}

impl CapturedImage {
    pub fn side(&self) -> Side {
        self.slot.side
    }

    pub fn angle(&self) -> Angle {
        self.slot.angle
    }

    /// Suggested file name, e.g. `left-sole-1a2b3c4d.jpg`
    pub fn file_name(&self) -> String {
        let short = self.id.simple().to_string();
        format!("{}-{}-{}.jpg", self.slot.side, self.slot.angle, &short[..8])
    }
}

/// Metadata stored alongside a finished scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    pub device: String,
    pub capture_date: DateTime<Utc>,
    pub total_images: usize,
    pub simulation: bool,
    /// Images taken despite a live quality warning
    pub overrides: usize,
}

/// Everything a completed scan hands to storage
#[derive(Debug, Clone)]
pub struct ScanSubmission {
    pub left: Vec<CapturedImage>,
    pub right: Vec<CapturedImage>,
    pub metadata: CaptureMetadata,
}

impl ScanSubmission {
    /// Group images by side, keeping capture order within each side
    pub fn new(images: Vec<CapturedImage>, device: String, simulation: bool) -> Self {
        let total_images = images.len();
        let overrides = images.iter().filter(|i| i.label.is_override()).count();
        let (left, right) = images.into_iter().partition(|i| i.slot.side == Side::Left);

        Self {
            left,
            right,
            metadata: CaptureMetadata {
                device,
                capture_date: Utc::now(),
                total_images,
                simulation,
                overrides,
            },
        }
    }

    /// Simulated scans are rehearsals and must not be stored
    pub fn should_persist(&self) -> bool {
        !self.metadata.simulation
    }

    pub fn is_simulation(&self) -> bool {
        self.metadata.simulation
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(side: Side, angle: Angle, label: CaptureLabel) -> CapturedImage {
        CapturedImage {
            id: Uuid::new_v4(),
            slot: CaptureSlot::new(side, angle),
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 1,
            height: 1,
            captured_at: Utc::now(),
            quality: QualityResult {
                sharpness: 0.0,
                blur_ok: false,
                brightness: 0.0,
                brightness_ok: false,
                contrast: 0.0,
                contrast_ok: false,
                passed: false,
                issues: Vec::new(),
            },
            label,
            source: ImageSource::Photo,
        }
    }

    #[test]
    fn test_submission_groups_by_side() {
        let images = vec![
            image(Side::Left, Angle::Top, CaptureLabel::CapturePhoto),
            image(Side::Right, Angle::Top, CaptureLabel::CaptureAnywayBlurry),
            image(Side::Left, Angle::Side, CaptureLabel::CapturePhoto),
        ];
        let submission = ScanSubmission::new(images, "Virtual Camera".into(), false);

        assert_eq!(submission.left.len(), 2);
        assert_eq!(submission.right.len(), 1);
        assert_eq!(submission.left[1].angle(), Angle::Side);
        assert_eq!(submission.metadata.total_images, 3);
        assert_eq!(submission.metadata.overrides, 1);
        assert!(submission.should_persist());
    }

    #[test]
    fn test_simulation_is_not_persisted() {
        let submission = ScanSubmission::new(Vec::new(), "Virtual Camera".into(), true);
        assert!(!submission.should_persist());
    }

    #[test]
    fn test_file_name() {
        let img = image(Side::Right, Angle::Sole, CaptureLabel::CapturePhoto);
        let name = img.file_name();
        assert!(name.starts_with("right-sole-"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_image_source_serializes_millis() {
        let json = serde_json::to_string(&ImageSource::VideoFrame {
            position: Duration::from_millis(1500),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"video_frame","position":1500}"#);
    }

    #[test]
    fn test_metadata_round_trips_capture_date() {
        let submission = ScanSubmission::new(Vec::new(), "Virtual Camera".into(), false);
        let json = serde_json::to_string(&submission.metadata).unwrap();
        let back: CaptureMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.capture_date, submission.metadata.capture_date);
        assert_eq!(back.device, "Virtual Camera");
    }
}

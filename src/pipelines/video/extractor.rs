// SPDX-License-Identifier: GPL-3.0-only

//! Frame extraction and ranking
//!
//! Turns a recorded take into a small, time-ordered set of sharp stills:
//!
//! ```text
//! take ─▶ decode+seek (sequential) ─▶ quick check ─▶ score (parallel)
//!      ─▶ top N by score ─▶ re-sort by time ─▶ JPEG
//! ```
//!
//! Seeking runs on one blocking worker because a decoder handles one seek at
//! a time. Scoring and encoding fan out across blocking workers.

use crate::app::frame_processor::QualityThresholds;
use crate::app::frame_processor::quality::{analyze_frame, quick_sharpness_ok, sharpness_score};
use crate::app::frame_processor::{CaptureLabel, QualityResult};
use crate::app::state::CaptureSlot;
use crate::app::submission::{CapturedImage, ImageSource};
use crate::backends::camera::types::{CameraFrame, RecordedTake};
use crate::constants::extraction as defaults;
use crate::errors::ExtractionError;
use crate::media::encoders::encode_frame_jpeg;
use crate::media::open_take;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Extraction tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Frames the take should yield before oversampling
    pub target_frames: usize,
    /// Seek points per target frame
    pub oversample: usize,
    /// Frames returned at most
    pub select: usize,
    /// Seconds skipped at both ends
    pub edge_margin_secs: f64,
    pub jpeg_quality: u8,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            target_frames: defaults::TARGET_FRAME_COUNT,
            oversample: defaults::OVERSAMPLE_FACTOR,
            select: defaults::SELECTED_FRAME_COUNT,
            edge_margin_secs: defaults::EDGE_MARGIN_SECS,
            jpeg_quality: defaults::FRAME_JPEG_QUALITY,
        }
    }
}

impl ExtractionConfig {
    /// Number of seek points
    pub fn sample_count(&self) -> usize {
        (self.target_frames * self.oversample).max(1)
    }
}

/// A decoded frame with its ranking score
#[derive(Debug, Clone)]
pub struct Candidate {
    pub frame: CameraFrame,
    pub position: Duration,
    pub score: f64,
}

/// One selected, encoded frame
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub position: Duration,
    /// Ranking score (200×150 Laplacian energy)
    pub score: f64,
    /// Full-resolution analysis of the frame
    pub quality: QualityResult,
}

impl ExtractedFrame {
    /// Attach the frame to a capture slot
    pub fn into_captured(self, slot: CaptureSlot, label: CaptureLabel) -> CapturedImage {
        CapturedImage {
            id: uuid::Uuid::new_v4(),
            slot,
            jpeg: self.jpeg,
            width: self.width,
            height: self.height,
            captured_at: chrono::Utc::now(),
            quality: self.quality,
            label,
            source: ImageSource::VideoFrame {
                position: self.position,
            },
        }
    }
}

/// Evenly spaced seek points over `[margin, duration - margin]`
///
/// Takes too short for both margins are sampled once, at their midpoint.
pub fn sample_timestamps(duration: f64, count: usize, margin: f64) -> Vec<f64> {
    if !duration.is_finite() || duration <= 0.0 || count == 0 {
        return Vec::new();
    }

    let start = margin.max(0.0);
    let end = duration - margin.max(0.0);
    if end <= start {
        return vec![duration / 2.0];
    }
    if count == 1 {
        return vec![(start + end) / 2.0];
    }

    let step = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Keep the `keep` highest-scoring candidates, returned in time order
///
/// Ties keep the earlier frame.
pub fn rank_candidates(mut candidates: Vec<Candidate>, keep: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.position.cmp(&b.position))
    });
    candidates.truncate(keep);
    candidates.sort_by_key(|c| c.position);
    candidates
}

/// Extracts the sharpest frames from recorded takes
#[derive(Debug, Clone, Default)]
pub struct FrameExtractor {
    config: ExtractionConfig,
    thresholds: QualityThresholds,
}

impl FrameExtractor {
    pub fn new(config: ExtractionConfig, thresholds: QualityThresholds) -> Self {
        Self { config, thresholds }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run the whole extraction on `take`
    ///
    /// An empty result is valid: no frame passed the quick sharpness check.
    pub async fn extract(&self, take: RecordedTake) -> Result<Vec<ExtractedFrame>, ExtractionError> {
        let started = Instant::now();

        let survivors = self.decode_survivors(take).await?;
        let decoded = survivors.len();

        let candidates = score_candidates(survivors).await?;
        let selected = rank_candidates(candidates, self.config.select);
        let frames = self.encode_selected(selected).await?;

        info!(
            survivors = decoded,
            selected = frames.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Frame extraction complete"
        );
        Ok(frames)
    }

    /// Seek, decode and quick-check every sample point on one worker
    async fn decode_survivors(
        &self,
        take: RecordedTake,
    ) -> Result<Vec<(CameraFrame, Duration)>, ExtractionError> {
        let count = self.config.sample_count();
        let margin = self.config.edge_margin_secs;
        let thresholds = self.thresholds.clone();

        tokio::task::spawn_blocking(move || {
            let mut video = open_take(&take)?;
            let duration = video.duration();
            let timestamps = sample_timestamps(duration, count, margin);
            debug!(duration, points = timestamps.len(), "Sampling take");

            let mut survivors: Vec<(CameraFrame, Duration)> = Vec::new();
            for t in timestamps {
                let frame = match video.frame_at(t) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, t, "Skipping seek point");
                        continue;
                    }
                };
                let position = frame.position.unwrap_or_else(|| Duration::from_secs_f64(t));

                // Short takes map several seek points onto one frame
                if survivors.iter().any(|(_, p)| *p == position) {
                    continue;
                }
                if !quick_sharpness_ok(&frame, &thresholds) {
                    debug!(t, "Rejected by quick sharpness check");
                    continue;
                }
                survivors.push((frame, position));
            }
            Ok(survivors)
        })
        .await
        .map_err(|e| ExtractionError::TaskFailed(e.to_string()))?
    }

    async fn encode_selected(
        &self,
        selected: Vec<Candidate>,
    ) -> Result<Vec<ExtractedFrame>, ExtractionError> {
        let quality = self.config.jpeg_quality;
        let tasks = selected.into_iter().map(|candidate| {
            let thresholds = self.thresholds.clone();
            tokio::task::spawn_blocking(move || {
                let jpeg = encode_frame_jpeg(&candidate.frame, quality)?;
                Ok::<_, ExtractionError>(ExtractedFrame {
                    jpeg,
                    width: candidate.frame.width,
                    height: candidate.frame.height,
                    position: candidate.position,
                    score: candidate.score,
                    quality: analyze_frame(&candidate.frame, &thresholds),
                })
            })
        });

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined
                    .map_err(|e| ExtractionError::TaskFailed(e.to_string()))
                    .and_then(|encoded| encoded)
            })
            .collect()
    }
}

/// Score decoded frames in parallel
async fn score_candidates(
    survivors: Vec<(CameraFrame, Duration)>,
) -> Result<Vec<Candidate>, ExtractionError> {
    let tasks = survivors.into_iter().map(|(frame, position)| {
        tokio::task::spawn_blocking(move || {
            let score = sharpness_score(&frame);
            Candidate {
                frame,
                position,
                score,
            }
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.map_err(|e| ExtractionError::TaskFailed(e.to_string())))
        .collect()
}

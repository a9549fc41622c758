// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer decoder for container takes (WebM, Matroska, MP4)
//!
//! The take is written to a temporary file and opened with `decodebin`.
//! The pipeline stays paused; each [`SeekableVideo::frame_at`] call issues an
//! accurate flushing seek and pulls the resulting preroll sample.

use super::SeekableVideo;
use crate::backends::camera::types::{CameraFrame, FrameData, PixelFormat};
use crate::constants::extraction::SEEK_TIMEOUT_SECS;
use crate::errors::ExtractionError;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Seekable decoder over a container take
pub struct GstTakeDecoder {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    duration: f64,
    file_path: PathBuf,
}

impl GstTakeDecoder {
    /// Decode a take held in memory
    pub fn open(data: &[u8]) -> Result<Self, ExtractionError> {
        gstreamer::init()
            .map_err(|e| ExtractionError::DecodeFailed(format!("GStreamer init failed: {}", e)))?;

        let file_path =
            std::env::temp_dir().join(format!("footscan-decode-{}.take", uuid::Uuid::new_v4()));
        std::fs::write(&file_path, data)
            .map_err(|e| ExtractionError::DecodeFailed(format!("Failed to stage take: {}", e)))?;

        match Self::open_file(file_path.clone()) {
            Ok(decoder) => Ok(decoder),
            Err(e) => {
                let _ = std::fs::remove_file(&file_path);
                Err(e)
            }
        }
    }

    fn open_file(file_path: PathBuf) -> Result<Self, ExtractionError> {
        let pipeline_str = format!(
            "filesrc location=\"{}\" ! decodebin ! videoconvert ! \
             video/x-raw,format=RGBA ! appsink name=sink sync=false max-buffers=1",
            file_path.display()
        );
        debug!(pipeline = %pipeline_str, "Creating take decoder");

        let pipeline = gstreamer::parse::launch(&pipeline_str)
            .map_err(|e| ExtractionError::DecodeFailed(format!("Failed to create pipeline: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| ExtractionError::DecodeFailed("Failed to downcast to Pipeline".into()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| ExtractionError::DecodeFailed("Failed to get appsink".into()))?
            .downcast::<AppSink>()
            .map_err(|_| ExtractionError::DecodeFailed("Failed to downcast to AppSink".into()))?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Paused) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(ExtractionError::DecodeFailed(format!(
                "Failed to pause pipeline: {:?}",
                e
            )));
        }

        if let Err(e) = wait_for_async_done(&pipeline) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(e);
        }

        let duration = match pipeline.query_duration::<gstreamer::ClockTime>() {
            Some(d) if d > gstreamer::ClockTime::ZERO => d.seconds_f64(),
            _ => {
                let _ = pipeline.set_state(gstreamer::State::Null);
                return Err(ExtractionError::UnknownDuration);
            }
        };

        info!(duration_secs = duration, "Take decoder ready");

        Ok(Self {
            pipeline,
            appsink,
            duration,
            file_path,
        })
    }
}

impl SeekableVideo for GstTakeDecoder {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn frame_at(&mut self, secs: f64) -> Result<CameraFrame, ExtractionError> {
        let secs = secs.clamp(0.0, self.duration);
        let position = gstreamer::ClockTime::from_nseconds((secs * 1_000_000_000.0) as u64);

        if let Err(e) = self.pipeline.seek_simple(
            gstreamer::SeekFlags::FLUSH | gstreamer::SeekFlags::ACCURATE,
            position,
        ) {
            warn!(?e, secs, "Seek failed, using current preroll frame");
        }
        wait_for_async_done(&self.pipeline)?;

        let sample = self
            .appsink
            .try_pull_preroll(gstreamer::ClockTime::from_seconds(SEEK_TIMEOUT_SECS))
            .ok_or_else(|| {
                ExtractionError::DecodeFailed(format!("No frame after seeking to {:.2}s", secs))
            })?;

        let frame = frame_from_sample(&sample)?;
        let pts = sample
            .buffer()
            .and_then(|b| b.pts())
            .map(|t| Duration::from_nanos(t.nseconds()))
            .unwrap_or_else(|| Duration::from_secs_f64(secs));

        Ok(frame.with_position(pts))
    }
}

impl Drop for GstTakeDecoder {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        if let Err(e) = std::fs::remove_file(&self.file_path) {
            debug!(?e, path = %self.file_path.display(), "Failed to remove staged take");
        }
    }
}

/// Block until the pipeline settles after a state change or seek
fn wait_for_async_done(pipeline: &gstreamer::Pipeline) -> Result<(), ExtractionError> {
    let bus = pipeline
        .bus()
        .ok_or_else(|| ExtractionError::DecodeFailed("No bus on pipeline".into()))?;
    let deadline = Instant::now() + Duration::from_secs(SEEK_TIMEOUT_SECS);

    while Instant::now() < deadline {
        if let Some(msg) = bus.timed_pop(gstreamer::ClockTime::from_mseconds(100)) {
            match msg.view() {
                gstreamer::MessageView::Error(err) => {
                    return Err(ExtractionError::DecodeFailed(format!(
                        "Pipeline error: {}",
                        err.error()
                    )));
                }
                gstreamer::MessageView::AsyncDone(_) => return Ok(()),
                _ => {}
            }
        }
    }

    // Preroll may already be available even without AsyncDone
    warn!("Timed out waiting for decoder to settle");
    Ok(())
}

/// Copy a decoded sample into an owned frame
fn frame_from_sample(sample: &gstreamer::Sample) -> Result<CameraFrame, ExtractionError> {
    let caps = sample
        .caps()
        .ok_or_else(|| ExtractionError::DecodeFailed("No caps on sample".into()))?;
    let info = gstreamer_video::VideoInfo::from_caps(caps)
        .map_err(|e| ExtractionError::DecodeFailed(format!("Bad video caps: {}", e)))?;
    let format = PixelFormat::from_gst_format(info.format().to_str().as_str()).ok_or_else(|| {
        ExtractionError::DecodeFailed(format!("Unexpected format {:?}", info.format()))
    })?;

    let buffer = sample
        .buffer()
        .ok_or_else(|| ExtractionError::DecodeFailed("No buffer in sample".into()))?;
    let map = buffer
        .map_readable()
        .map_err(|_| ExtractionError::DecodeFailed("Failed to map buffer".into()))?;

    Ok(CameraFrame {
        width: info.width(),
        height: info.height(),
        data: FrameData::from(map.as_slice().to_vec()),
        format,
        stride: info.stride()[0] as u32,
        captured_at: Instant::now(),
        position: None,
    })
}

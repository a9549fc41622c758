// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera backend
//!
//! Live frames come from `v4l2src` (or `autovideosrc` when no device path is
//! configured for the requested facing mode), converted to RGBA and delivered
//! through an appsink callback. The newest frame is kept for still grabs;
//! while a take is being recorded every frame is also forwarded to the
//! recorder's `appsrc → vp8enc → webmmux` pipeline.

use super::frame_loop::{LoopAction, WorkerLoop};
use super::types::{
    BackendError, BackendResult, CameraFrame, FacingMode, FrameData, PixelFormat, RecordedTake,
    TakeContainer,
};
use super::{CameraDevice, FrameSource, Recorder};
use crate::constants::capture as capture_consts;
use gstreamer::prelude::*;
use gstreamer_app::{AppSink, AppSrc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Channel feeding frames into an active recording
///
/// Written by recorder start/stop, read by the appsink callback.
type SharedRecordingSender = Arc<Mutex<Option<tokio::sync::mpsc::Sender<CameraFrame>>>>;

/// Frames buffered between the capture callback and the encoder
const RECORDING_QUEUE_DEPTH: usize = 8;

/// How long the recorder waits for EOS before giving up
const FINALIZE_TIMEOUT_SECS: u64 = 5;

/// A V4L2 (or auto-detected) camera opened through GStreamer
#[derive(Debug, Clone)]
pub struct GstCameraDevice {
    name: String,
    environment_device: Option<String>,
    user_device: Option<String>,
    width: u32,
    height: u32,
}

impl GstCameraDevice {
    /// Camera requesting the default capture resolution
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            environment_device: None,
            user_device: None,
            width: capture_consts::TARGET_WIDTH,
            height: capture_consts::TARGET_HEIGHT,
        }
    }

    /// Bind a V4L2 device node to a facing mode
    pub fn with_device(mut self, facing: FacingMode, path: &str) -> Self {
        match facing {
            FacingMode::Environment => self.environment_device = Some(path.to_string()),
            FacingMode::User => self.user_device = Some(path.to_string()),
        }
        self
    }

    /// Override the requested resolution
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn source_element(&self, facing: FacingMode) -> String {
        let path = match facing {
            FacingMode::Environment => self.environment_device.as_ref(),
            FacingMode::User => self.user_device.as_ref(),
        };
        match path {
            Some(p) => format!("v4l2src device=\"{}\"", p),
            None => "autovideosrc".to_string(),
        }
    }
}

impl CameraDevice for GstCameraDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn start(&mut self, facing: FacingMode) -> BackendResult<Box<dyn FrameSource>> {
        let source = GstFrameSource::open(&self.source_element(facing), self.width, self.height)?;
        info!(device = %self.name, %facing, "Camera started");
        Ok(Box::new(source))
    }
}

/// Latest frame slot shared with the appsink callback
type FrameSlot = Arc<(Mutex<Option<CameraFrame>>, Condvar)>;

/// Live RGBA stream from a GStreamer capture pipeline
pub struct GstFrameSource {
    pipeline: Option<gstreamer::Pipeline>,
    latest: FrameSlot,
    recording_sender: SharedRecordingSender,
    requested: (u32, u32),
}

impl GstFrameSource {
    /// Build and start the capture pipeline
    pub fn open(source: &str, width: u32, height: u32) -> BackendResult<Self> {
        gstreamer::init().map_err(|e| {
            BackendError::InitializationFailed(format!("GStreamer init failed: {}", e))
        })?;

        let pipeline_str = format!(
            "{} ! videoconvert ! videoscale ! \
             video/x-raw,format=RGBA,width={},height={} ! \
             appsink name=sink max-buffers=1 drop=true sync=false",
            source, width, height
        );
        debug!(pipeline = %pipeline_str, "Creating capture pipeline");

        let pipeline = gstreamer::parse::launch(&pipeline_str)
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to create pipeline: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Failed to downcast to Pipeline".into()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to find appsink".into()))?
            .downcast::<AppSink>()
            .map_err(|_| BackendError::InitializationFailed("Failed to downcast to AppSink".into()))?;

        let latest: FrameSlot = Arc::new((Mutex::new(None), Condvar::new()));
        let recording_sender: SharedRecordingSender = Arc::new(Mutex::new(None));
        install_frame_callback(&appsink, Arc::clone(&latest), Arc::clone(&recording_sender));

        if pipeline.set_state(gstreamer::State::Playing).is_err() {
            let err = take_bus_error(&pipeline);
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(err);
        }

        let (result, _state, _pending) = pipeline.state(gstreamer::ClockTime::from_seconds(5));
        if result.is_err() {
            let err = take_bus_error(&pipeline);
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(err);
        }

        info!(width, height, "Capture pipeline running");

        Ok(Self {
            pipeline: Some(pipeline),
            latest,
            recording_sender,
            requested: (width, height),
        })
    }
}

impl FrameSource for GstFrameSource {
    fn resolution(&self) -> (u32, u32) {
        let (lock, _) = &*self.latest;
        match lock.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|f| (f.width, f.height))
                .unwrap_or(self.requested),
            Err(_) => self.requested,
        }
    }

    fn grab_frame(&mut self) -> BackendResult<CameraFrame> {
        if self.pipeline.is_none() {
            return Err(BackendError::Disconnected);
        }

        let (lock, ready) = &*self.latest;
        let guard = lock
            .lock()
            .map_err(|_| BackendError::Other("Frame slot poisoned".into()))?;
        let (guard, _timeout) = ready
            .wait_timeout_while(guard, capture_consts::FRAME_TIMEOUT, |frame| frame.is_none())
            .map_err(|_| BackendError::Other("Frame slot poisoned".into()))?;

        guard.clone().ok_or(BackendError::NoFrameAvailable)
    }

    fn create_recorder(&mut self) -> BackendResult<Box<dyn Recorder>> {
        if self.pipeline.is_none() {
            return Err(BackendError::Disconnected);
        }
        let (width, height) = self.resolution();
        Ok(Box::new(GstRecorder::new(
            Arc::clone(&self.recording_sender),
            width,
            height,
        )))
    }

    fn stop(&mut self) {
        if let Ok(mut sender) = self.recording_sender.lock() {
            sender.take();
        }
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                error!(?e, "Failed to set capture pipeline to Null");
            }
            info!("Capture pipeline stopped");
        }
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn install_frame_callback(appsink: &AppSink, latest: FrameSlot, recording: SharedRecordingSender) {
    let frame_counter = Arc::new(AtomicU64::new(0));

    appsink.set_callbacks(
        gstreamer_app::AppSinkCallbacks::builder()
            .new_sample(move |appsink| {
                let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);
                let sample = appsink
                    .pull_sample()
                    .map_err(|_| gstreamer::FlowError::Eos)?;

                let frame = match frame_from_sample(sample) {
                    Ok(frame) => frame,
                    Err(e) => {
                        if frame_num % 30 == 0 {
                            warn!(frame = frame_num, error = %e, "Dropping undecodable sample");
                        }
                        return Ok(gstreamer::FlowSuccess::Ok);
                    }
                };

                if let Ok(sender) = recording.lock()
                    && let Some(tx) = sender.as_ref()
                    && tx.try_send(frame.clone()).is_err()
                {
                    trace!(frame = frame_num, "Recording queue full, frame dropped");
                }

                let (lock, ready) = &*latest;
                if let Ok(mut slot) = lock.lock() {
                    *slot = Some(frame);
                    ready.notify_all();
                }

                Ok(gstreamer::FlowSuccess::Ok)
            })
            .build(),
    );
}

/// Wrap an appsink sample as a zero-copy frame
fn frame_from_sample(sample: gstreamer::Sample) -> BackendResult<CameraFrame> {
    let caps = sample
        .caps()
        .ok_or_else(|| BackendError::Other("No caps on sample".into()))?;
    let info = gstreamer_video::VideoInfo::from_caps(caps)
        .map_err(|e| BackendError::Other(format!("Bad video caps: {}", e)))?;
    let format = PixelFormat::from_gst_format(info.format().to_str().as_str())
        .ok_or_else(|| BackendError::Other(format!("Unexpected format {:?}", info.format())))?;

    let buffer = sample
        .buffer_owned()
        .ok_or_else(|| BackendError::Other("No buffer in sample".into()))?;
    let mapped = buffer
        .into_mapped_buffer_readable()
        .map_err(|_| BackendError::Other("Failed to map buffer".into()))?;

    Ok(CameraFrame {
        width: info.width(),
        height: info.height(),
        data: FrameData::from_mapped_buffer(mapped),
        format,
        stride: info.stride()[0] as u32,
        captured_at: Instant::now(),
        position: None,
    })
}

/// Pull the first error off the bus and classify it
fn take_bus_error(pipeline: &gstreamer::Pipeline) -> BackendError {
    let Some(bus) = pipeline.bus() else {
        return BackendError::InitializationFailed("No bus on pipeline".into());
    };
    match bus.timed_pop_filtered(
        gstreamer::ClockTime::from_mseconds(500),
        &[gstreamer::MessageType::Error],
    ) {
        Some(msg) => match msg.view() {
            gstreamer::MessageView::Error(err) => classify_error(err.error()),
            _ => BackendError::InitializationFailed("Pipeline failed to start".into()),
        },
        None => BackendError::InitializationFailed("Pipeline failed to start".into()),
    }
}

/// Map a GStreamer resource error onto the device error taxonomy
fn classify_error(err: gstreamer::glib::Error) -> BackendError {
    let message = err.message().to_string();
    match err.kind::<gstreamer::ResourceError>() {
        Some(gstreamer::ResourceError::NotFound) => BackendError::DeviceNotFound(message),
        Some(gstreamer::ResourceError::Busy) => BackendError::Busy(message),
        Some(gstreamer::ResourceError::NotAuthorized) => BackendError::PermissionDenied(message),
        Some(gstreamer::ResourceError::OpenRead | gstreamer::ResourceError::OpenReadWrite)
            if message.to_lowercase().contains("permission") =>
        {
            BackendError::PermissionDenied(message)
        }
        _ => BackendError::InitializationFailed(message),
    }
}

/// Pipeline state for a take in progress
struct ActiveRecording {
    pipeline: gstreamer::Pipeline,
    pump: WorkerLoop,
    file: TakeFile,
    started: Instant,
}

/// Temporary take file, removed when dropped
struct TakeFile(PathBuf);

impl TakeFile {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("footscan-take-{}.webm", uuid::Uuid::new_v4())))
    }

    fn path(&self) -> &Path {
        &self.0
    }

    /// Contents of the finished take; the file goes away either way
    fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.0)
    }
}

impl Drop for TakeFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.0.display(), error = %e, "Failed to remove take file");
        }
    }
}

/// WebM recorder fed from the capture pipeline's frames
pub struct GstRecorder {
    recording_sender: SharedRecordingSender,
    width: u32,
    height: u32,
    active: Option<ActiveRecording>,
}

impl GstRecorder {
    fn new(recording_sender: SharedRecordingSender, width: u32, height: u32) -> Self {
        Self {
            recording_sender,
            width,
            height,
            active: None,
        }
    }

    fn build_pipeline(&self, file_path: &std::path::Path) -> BackendResult<(gstreamer::Pipeline, AppSrc)> {
        let pipeline_str = format!(
            "appsrc name=src is-live=true format=time do-timestamp=true ! \
             videoconvert ! vp8enc deadline=1 ! webmmux ! \
             filesink location=\"{}\"",
            file_path.display()
        );

        let pipeline = gstreamer::parse::launch(&pipeline_str)
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to create recorder: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Failed to downcast to Pipeline".into()))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to find appsrc".into()))?
            .downcast::<AppSrc>()
            .map_err(|_| BackendError::InitializationFailed("Failed to downcast to AppSrc".into()))?;

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", PixelFormat::RGBA.to_gst_format_string())
            .field("width", self.width as i32)
            .field("height", self.height as i32)
            .field("framerate", gstreamer::Fraction::new(0, 1))
            .build();
        appsrc.set_caps(Some(&caps));

        Ok((pipeline, appsrc))
    }
}

impl Recorder for GstRecorder {
    fn start(&mut self) -> BackendResult<()> {
        if self.active.is_some() {
            return Err(BackendError::RecordingInProgress);
        }

        let file = TakeFile::new();
        let (pipeline, appsrc) = self.build_pipeline(file.path())?;

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to start recording: {}", e))
        })?;

        let (tx, mut rx) = tokio::sync::mpsc::channel::<CameraFrame>(RECORDING_QUEUE_DEPTH);
        let (width, height) = (self.width, self.height);
        let pump = WorkerLoop::spawn("take-pump", move || match rx.blocking_recv() {
            Some(frame) => {
                if frame.width != width || frame.height != height || frame.stride != width * 4 {
                    warn!(
                        width = frame.width,
                        height = frame.height,
                        "Frame does not match recorder caps, skipped"
                    );
                    return LoopAction::Continue;
                }
                let buffer = gstreamer::Buffer::from_slice(frame.data);
                if let Err(e) = appsrc.push_buffer(buffer) {
                    warn!(?e, "Recorder rejected frame");
                    return LoopAction::Stop;
                }
                LoopAction::Continue
            }
            None => {
                let _ = appsrc.end_of_stream();
                LoopAction::Stop
            }
        });

        if let Ok(mut sender) = self.recording_sender.lock() {
            *sender = Some(tx);
        }

        info!(path = %file.path().display(), "Recording started");
        self.active = Some(ActiveRecording {
            pipeline,
            pump,
            file,
            started: Instant::now(),
        });
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<RecordedTake> {
        let mut active = self.active.take().ok_or(BackendError::NoRecordingInProgress)?;

        // Closing the channel makes the pump send EOS
        if let Ok(mut sender) = self.recording_sender.lock() {
            sender.take();
        }
        active.pump.join();

        if let Some(bus) = active.pipeline.bus()
            && let Some(msg) = bus.timed_pop_filtered(
                gstreamer::ClockTime::from_seconds(FINALIZE_TIMEOUT_SECS),
                &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
            )
            && let gstreamer::MessageView::Error(err) = msg.view()
        {
            warn!(error = %err.error(), "Recorder error while finalizing, keeping partial take");
        }

        if let Err(e) = active.pipeline.set_state(gstreamer::State::Null) {
            error!(?e, "Failed to set recorder pipeline to Null");
        }

        let recorded_for = active.started.elapsed();
        let data = active.file.into_bytes()?;
        info!(bytes = data.len(), secs = recorded_for.as_secs_f64(), "Recording stopped");

        Ok(RecordedTake {
            data,
            container: TakeContainer::Container,
            recorded_for,
            auto_stopped: false,
        })
    }

    fn is_recording(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for GstRecorder {
    fn drop(&mut self) {
        if self.active.is_some() {
            debug!("Recorder dropped while recording, discarding take");
            let _ = self.stop();
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! In-memory camera backend
//!
//! Serves scripted frames through the same [`CameraDevice`] / [`FrameSource`]
//! / [`Recorder`] traits as the GStreamer backend. Recordings come back as
//! MJPEG takes, either a canned frame sequence or the served frames repeated
//! for the wall-clock recording time.
//!
//! Used by simulation mode and by tests. A cloneable [`VirtualCameraHandle`]
//! observes session lifecycle and scripts failures after the camera has been
//! handed to a controller.

use crate::backends::camera::types::{
    BackendError, BackendResult, CameraFrame, FacingMode, RecordedTake,
};
use crate::backends::camera::{CameraDevice, FrameSource, Recorder};
use crate::media::encoders::MjpegWriter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Frame rate of takes rendered from live frames
const SIMULATED_TAKE_FPS: f64 = 10.0;

/// JPEG quality of frames inside simulated takes
const TAKE_JPEG_QUALITY: u8 = 90;

/// Default test pattern size
const PATTERN_WIDTH: u32 = 640;
const PATTERN_HEIGHT: u32 = 480;
const PATTERN_SQUARE: u32 = 16;

/// Sharp, evenly lit checkerboard
///
/// Alternates luma 60 and 200 so brightness, sharpness and contrast all pass.
pub fn test_pattern(width: u32, height: u32, square: u32) -> CameraFrame {
    let square = square.max(1);
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let v = if ((x / square) + (y / square)) % 2 == 0 {
                60
            } else {
                200
            };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    CameraFrame::from_rgba(width, height, data)
}

#[derive(Debug, Default)]
struct HandleState {
    open_sessions: AtomicUsize,
    starts: AtomicUsize,
    grabs: AtomicUsize,
    last_facing: Mutex<Option<FacingMode>>,
    next_failure: Mutex<Option<BackendError>>,
    permanent_failure: Mutex<Option<BackendError>>,
}

/// Observer and failure script for a [`VirtualCamera`]
#[derive(Debug, Clone, Default)]
pub struct VirtualCameraHandle {
    state: Arc<HandleState>,
}

impl VirtualCameraHandle {
    /// Sessions currently holding the device
    pub fn open_sessions(&self) -> usize {
        self.state.open_sessions.load(Ordering::SeqCst)
    }

    /// Successful starts so far
    pub fn starts(&self) -> usize {
        self.state.starts.load(Ordering::SeqCst)
    }

    /// Frames grabbed so far, across sessions
    pub fn grabs(&self) -> usize {
        self.state.grabs.load(Ordering::SeqCst)
    }

    /// Facing mode of the most recent successful start
    pub fn last_facing(&self) -> Option<FacingMode> {
        self.state.last_facing.lock().ok().and_then(|f| *f)
    }

    /// Make the next start fail once with `error`
    pub fn fail_next_start(&self, error: BackendError) {
        if let Ok(mut slot) = self.state.next_failure.lock() {
            *slot = Some(error);
        }
    }

    /// Make every start fail with `error`, or clear with `None`
    pub fn set_failure(&self, error: Option<BackendError>) {
        if let Ok(mut slot) = self.state.permanent_failure.lock() {
            *slot = error;
        }
    }

    fn take_failure(&self) -> Option<BackendError> {
        if let Some(err) = self.state.next_failure.lock().ok().and_then(|mut f| f.take()) {
            return Some(err);
        }
        self.state
            .permanent_failure
            .lock()
            .ok()
            .and_then(|f| f.clone())
    }
}

/// Scripted in-memory camera
pub struct VirtualCamera {
    name: String,
    frames: Arc<Vec<CameraFrame>>,
    take: Option<(Arc<Vec<CameraFrame>>, f64)>,
    handle: VirtualCameraHandle,
}

impl Default for VirtualCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualCamera {
    /// Camera serving the default checkerboard pattern
    pub fn new() -> Self {
        Self {
            name: "Virtual Camera".into(),
            frames: Arc::new(vec![test_pattern(
                PATTERN_WIDTH,
                PATTERN_HEIGHT,
                PATTERN_SQUARE,
            )]),
            take: None,
            handle: VirtualCameraHandle::default(),
        }
    }

    /// Serve these frames in a loop instead of the test pattern
    pub fn with_frames(mut self, frames: Vec<CameraFrame>) -> Self {
        if !frames.is_empty() {
            self.frames = Arc::new(frames);
        }
        self
    }

    /// Return this frame sequence as every recorded take
    pub fn with_take(mut self, frames: Vec<CameraFrame>, fps: f64) -> Self {
        self.take = Some((Arc::new(frames), fps));
        self
    }

    /// Make the next start fail once with `error`
    pub fn fail_next_start(self, error: BackendError) -> Self {
        self.handle.fail_next_start(error);
        self
    }

    /// Make every start fail with `error`
    pub fn failing_with(self, error: BackendError) -> Self {
        self.handle.set_failure(Some(error));
        self
    }

    /// Observer for this camera
    pub fn handle(&self) -> VirtualCameraHandle {
        self.handle.clone()
    }
}

impl CameraDevice for VirtualCamera {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn start(&mut self, facing: FacingMode) -> BackendResult<Box<dyn FrameSource>> {
        if let Some(err) = self.handle.take_failure() {
            debug!(%err, "Virtual camera start failing as scripted");
            return Err(err);
        }

        self.handle.state.starts.fetch_add(1, Ordering::SeqCst);
        self.handle.state.open_sessions.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.handle.state.last_facing.lock() {
            *last = Some(facing);
        }
        info!(%facing, "Virtual camera started");

        Ok(Box::new(VirtualFrameSource {
            frames: Arc::clone(&self.frames),
            take: self.take.clone(),
            next: 0,
            open: true,
            handle: self.handle.clone(),
        }))
    }
}

struct VirtualFrameSource {
    frames: Arc<Vec<CameraFrame>>,
    take: Option<(Arc<Vec<CameraFrame>>, f64)>,
    next: usize,
    open: bool,
    handle: VirtualCameraHandle,
}

impl FrameSource for VirtualFrameSource {
    fn resolution(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0))
    }

    fn grab_frame(&mut self) -> BackendResult<CameraFrame> {
        if !self.open {
            return Err(BackendError::Disconnected);
        }
        let mut frame = self.frames[self.next % self.frames.len()].clone();
        frame.captured_at = Instant::now();
        self.next += 1;
        self.handle.state.grabs.fetch_add(1, Ordering::SeqCst);
        Ok(frame)
    }

    fn create_recorder(&mut self) -> BackendResult<Box<dyn Recorder>> {
        if !self.open {
            return Err(BackendError::Disconnected);
        }
        Ok(Box::new(VirtualRecorder {
            frames: Arc::clone(&self.frames),
            take: self.take.clone(),
            started: None,
        }))
    }

    fn stop(&mut self) {
        if self.open {
            self.open = false;
            self.handle.state.open_sessions.fetch_sub(1, Ordering::SeqCst);
            info!("Virtual camera stopped");
        }
    }
}

impl Drop for VirtualFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct VirtualRecorder {
    frames: Arc<Vec<CameraFrame>>,
    take: Option<(Arc<Vec<CameraFrame>>, f64)>,
    started: Option<Instant>,
}

impl Recorder for VirtualRecorder {
    fn start(&mut self) -> BackendResult<()> {
        if self.started.is_some() {
            return Err(BackendError::RecordingInProgress);
        }
        self.started = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<RecordedTake> {
        let started = self.started.take().ok_or(BackendError::NoRecordingInProgress)?;
        let elapsed = started.elapsed();

        let (frames, count, fps) = match &self.take {
            Some((frames, fps)) => (frames, frames.len(), *fps),
            None => {
                let count = ((elapsed.as_secs_f64() * SIMULATED_TAKE_FPS) as usize).max(1);
                (&self.frames, count, SIMULATED_TAKE_FPS)
            }
        };

        let mut writer = MjpegWriter::new(fps, TAKE_JPEG_QUALITY);
        if !frames.is_empty() {
            for i in 0..count {
                writer
                    .push(&frames[i % frames.len()])
                    .map_err(|e| BackendError::Other(e.to_string()))?;
            }
        }

        debug!(frames = writer.frame_count(), fps, "Virtual take recorded");
        Ok(writer.finish(elapsed, false))
    }

    fn is_recording(&self) -> bool {
        self.started.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::TakeContainer;

    #[test]
    fn test_session_counting() {
        let mut camera = VirtualCamera::new();
        let handle = camera.handle();

        let source = camera.start(FacingMode::User).unwrap();
        assert_eq!(handle.open_sessions(), 1);
        assert_eq!(handle.last_facing(), Some(FacingMode::User));

        drop(source);
        assert_eq!(handle.open_sessions(), 0);
        assert_eq!(handle.starts(), 1);
    }

    #[test]
    fn test_scripted_failure_is_one_shot() {
        let mut camera =
            VirtualCamera::new().fail_next_start(BackendError::PermissionDenied("denied".into()));

        assert!(matches!(
            camera.start(FacingMode::Environment),
            Err(BackendError::PermissionDenied(_))
        ));
        assert!(camera.start(FacingMode::Environment).is_ok());
    }

    #[test]
    fn test_stopped_source_refuses_frames() {
        let mut camera = VirtualCamera::new();
        let mut source = camera.start(FacingMode::Environment).unwrap();
        assert!(source.grab_frame().is_ok());
        source.stop();
        assert_eq!(source.grab_frame().unwrap_err(), BackendError::Disconnected);
    }

    #[test]
    fn test_canned_take_is_mjpeg() {
        let frames = vec![test_pattern(32, 24, 4), test_pattern(32, 24, 8)];
        let mut camera = VirtualCamera::new().with_take(frames, 4.0);
        let mut source = camera.start(FacingMode::Environment).unwrap();
        let mut recorder = source.create_recorder().unwrap();

        assert!(recorder.stop().is_err());
        recorder.start().unwrap();
        assert!(recorder.is_recording());
        let take = recorder.stop().unwrap();

        assert_eq!(take.container, TakeContainer::Mjpeg { fps: 4.0 });
        let reader = crate::media::decoders::mjpeg::MjpegReader::new(&take.data, 4.0).unwrap();
        assert_eq!(reader.frame_count(), 2);
    }

    #[test]
    fn test_pattern_mean_is_mid_grey() {
        let frame = test_pattern(64, 64, 8);
        let mean: f64 = frame.data.chunks_exact(4).map(|p| p[0] as f64).sum::<f64>() / (64.0 * 64.0);
        assert!((mean - 130.0).abs() < 1.0);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Guided foot-scan capture
//!
//! [`CaptureController`] walks the operator through every (side, angle)
//! slot. Each capture step owns exactly one camera session:
//!
//! ```text
//!            enter capture step                     leave capture step
//!   ┌──────────────────────────────────┐   ┌──────────────────────────────┐
//!   │ device.start(facing)             │   │ recording dropped            │
//!   │ QualityMonitor::start(source)    │   │ monitor stopped and joined   │
//!   └──────────────────────────────────┘   │ source.stop()                │
//!                                          └──────────────────────────────┘
//! ```
//!
//! Transitions are decided by [`state::CaptureStep::apply`]; this module
//! only hangs camera acquisition and release off them.
//!
//! # Modules
//!
//! - `frame_processor`: quality analysis and the live monitor
//! - `state`: sides, angles, steps and recording state
//! - `submission`: captured images and the finished scan

pub mod frame_processor;
pub mod state;
pub mod submission;

pub use frame_processor::{CaptureLabel, LiveQualityIndicator, QualityMonitor, QualityResult};
pub use state::{Angle, CaptureMode, CaptureSlot, CaptureStep, RecordingState, Side, StepAction};
pub use submission::{CaptureMetadata, CapturedImage, ImageSource, ScanSubmission};

use crate::backends::camera::{BackendError, CameraDevice, FacingMode, SharedFrameSource};
use crate::config::Config;
use crate::errors::CaptureError;
use crate::pipelines::photo::{PhotoCapture, PhotoEncoder};
use crate::pipelines::video::{FrameExtractor, RecordingSession};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Result of finishing a video take
#[derive(Debug)]
pub enum VideoOutcome {
    /// Best frames of the take, in time order; the slot is filled
    Frames(Vec<CapturedImage>),
    /// No frame passed the quick sharpness check; the step stays put
    RetakeNeeded,
}

/// A take in progress and where its frames will go
struct ActiveTake {
    slot: CaptureSlot,
    label: CaptureLabel,
    recording: RecordingSession,
}

/// Camera resources held by one capture step
struct CameraSession {
    source: SharedFrameSource,
    monitor: QualityMonitor,
    take: Option<ActiveTake>,
}

impl CameraSession {
    fn release(mut self) {
        if self.take.take().is_some() {
            debug!("Dropping unfinished take with session");
        }
        self.monitor.stop();
        match self.source.lock() {
            Ok(mut source) => source.stop(),
            Err(_) => warn!("Frame source lock poisoned during release"),
        }
    }
}

/// Guided capture state machine with camera lifecycle
pub struct CaptureController {
    device: Box<dyn CameraDevice>,
    config: Config,
    step: CaptureStep,
    mode: CaptureMode,
    facing: FacingMode,
    simulation: bool,
    session: Option<CameraSession>,
    session_error: Option<BackendError>,
    images: BTreeMap<CaptureSlot, Vec<CapturedImage>>,
    encoder: PhotoEncoder,
    extractor: FrameExtractor,
}

impl CaptureController {
    pub fn new(device: Box<dyn CameraDevice>, config: Config) -> Self {
        let encoder = PhotoEncoder::new(config.capture.photo_jpeg_quality);
        let extractor = FrameExtractor::new(config.extraction.clone(), config.quality.clone());
        Self {
            device,
            step: CaptureStep::default(),
            mode: config.capture.default_mode,
            facing: config.capture.default_facing,
            simulation: false,
            session: None,
            session_error: None,
            images: BTreeMap::new(),
            encoder,
            extractor,
            config,
        }
    }

    /// Rehearsal run: completion needs no minimum and nothing is persisted
    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.simulation = simulation;
        self
    }

    pub fn step(&self) -> CaptureStep {
        self.step
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn is_simulation(&self) -> bool {
        self.simulation
    }

    /// Whether the current step holds an open camera
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Why the current step has no camera, until a retry succeeds
    pub fn session_error(&self) -> Option<&BackendError> {
        self.session_error.as_ref()
    }

    /// Images captured so far, by slot
    pub fn images(&self) -> &BTreeMap<CaptureSlot, Vec<CapturedImage>> {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }

    pub fn filled_slots(&self) -> BTreeSet<CaptureSlot> {
        self.images.keys().copied().collect()
    }

    /// Switch between photo and video acquisition
    pub fn set_mode(&mut self, mode: CaptureMode) -> Result<(), CaptureError> {
        if self.recording_state() != RecordingState::Idle {
            return Err(CaptureError::AlreadyRecording);
        }
        if self.mode != mode {
            info!(from = ?self.mode, to = ?mode, "Capture mode changed");
            self.mode = mode;
        }
        Ok(())
    }

    /// Latest live indicator; all-clear when no session is open
    pub fn live_quality(&self) -> LiveQualityIndicator {
        self.session
            .as_ref()
            .map(|s| s.monitor.latest())
            .unwrap_or_default()
    }

    /// Live indicator updates for the current session
    pub fn subscribe_quality(&self) -> Option<watch::Receiver<LiveQualityIndicator>> {
        self.session.as_ref().map(|s| s.monitor.subscribe())
    }

    /// Capture button label for the current live indicator
    pub fn capture_label(&self) -> CaptureLabel {
        self.live_quality().label()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.session
            .as_ref()
            .and_then(|s| s.take.as_ref())
            .map(|t| t.recording.state())
            .unwrap_or_default()
    }

    /// Leave the instructions and open the camera for the first slot
    pub fn begin(&mut self) -> Result<(), CaptureError> {
        self.transition(StepAction::Begin)
    }

    /// Re-open the camera after a device failure
    pub fn retry(&mut self) -> Result<(), CaptureError> {
        self.transition(StepAction::Retry)
    }

    /// Go back from review to one slot
    pub fn retake(&mut self, slot: CaptureSlot) -> Result<(), CaptureError> {
        self.transition(StepAction::Retake(slot))
    }

    /// Discard every image and start over from the first slot
    pub fn reset(&mut self) -> Result<(), CaptureError> {
        if self.step != CaptureStep::Review {
            return Err(self.invalid(StepAction::Reset));
        }
        self.images.clear();
        self.transition(StepAction::Reset)
    }

    /// Toggle the facing mode, re-opening the camera if one is open
    pub fn flip_camera(&mut self) -> Result<FacingMode, CaptureError> {
        if self.recording_state() != RecordingState::Idle {
            return Err(CaptureError::AlreadyRecording);
        }
        self.facing = self.facing.toggled();
        info!(facing = %self.facing, "Camera facing switched");

        if self.step.is_capture() {
            self.release_session();
            self.acquire_session()?;
        }
        Ok(self.facing)
    }

    /// Grab and grade one still for the current slot, then advance
    ///
    /// The image is kept once graded. If the next slot's camera then fails
    /// to open, the call still succeeds and the failure is reported by
    /// [`Self::session_error`].
    pub fn capture_photo(&mut self) -> Result<CapturedImage, CaptureError> {
        let slot = self.step.slot().ok_or(CaptureError::NotCapturing(self.step))?;
        if self.recording_state() != RecordingState::Idle {
            return Err(CaptureError::AlreadyRecording);
        }
        let label = self.capture_label();
        let source = self
            .session
            .as_ref()
            .map(|s| Arc::clone(&s.source))
            .ok_or(CaptureError::NoActiveSession)?;

        let frame = match PhotoCapture::grab(&source) {
            Ok(frame) => frame,
            Err(error) => return Err(self.device_failure(error)),
        };
        let image = PhotoCapture::finish(&frame, slot, label, &self.config.quality, &self.encoder)?;

        self.images.insert(slot, vec![image.clone()]);
        self.advance_after_capture()?;
        Ok(image)
    }

    /// Start a capped take for the current slot
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        let slot = self.step.slot().ok_or(CaptureError::NotCapturing(self.step))?;
        if self.mode != CaptureMode::Video {
            return Err(self.invalid_named("start recording in photo mode"));
        }
        let cap = self.config.capture.max_recording();
        let label = self.capture_label();
        let session = self.session.as_mut().ok_or(CaptureError::NoActiveSession)?;
        if session.take.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let recorder = session
            .source
            .lock()
            .map_err(|_| BackendError::Other("Frame source lock poisoned".into()))
            .and_then(|mut source| source.create_recorder());
        let started = recorder.and_then(|recorder| RecordingSession::start(recorder, cap));
        match started {
            Ok(recording) => {
                session.take = Some(ActiveTake {
                    slot,
                    label,
                    recording,
                });
                Ok(())
            }
            Err(error) => Err(self.device_failure(error)),
        }
    }

    /// Stop the take and keep its best frames
    ///
    /// A take cut by the cap is collected the same way. An empty extraction
    /// leaves the step unchanged so the operator can record again. Frames go
    /// to the slot and label in force when the take started.
    pub async fn stop_recording(&mut self) -> Result<VideoOutcome, CaptureError> {
        if !self.step.is_capture() {
            return Err(CaptureError::NotCapturing(self.step));
        }
        let ActiveTake {
            slot,
            label,
            recording,
        } = self
            .session
            .as_mut()
            .and_then(|s| s.take.take())
            .ok_or(CaptureError::NotRecording)?;

        let take = match recording.stop() {
            Ok(take) => take,
            Err(error) => return Err(self.device_failure(error)),
        };
        info!(
            %slot,
            bytes = take.data.len(),
            auto_stopped = take.auto_stopped,
            "Take finished"
        );

        let frames = self.extractor.extract(take).await?;
        if frames.is_empty() {
            warn!(%slot, "No usable frames in take, retake needed");
            return Ok(VideoOutcome::RetakeNeeded);
        }

        let images: Vec<CapturedImage> = frames
            .into_iter()
            .map(|frame| frame.into_captured(slot, label))
            .collect();
        self.images.insert(slot, images.clone());
        self.advance_after_capture()?;
        Ok(VideoOutcome::Frames(images))
    }

    /// Finish from review and hand over the scan
    pub fn complete(&mut self) -> Result<ScanSubmission, CaptureError> {
        if self.step != CaptureStep::Review {
            return Err(self.invalid(StepAction::Complete));
        }
        let have = self.image_count();
        let need = self.config.capture.min_images;
        if !self.simulation && have < need {
            return Err(CaptureError::InsufficientImages { have, need });
        }

        self.transition(StepAction::Complete)?;
        let images: Vec<CapturedImage> = std::mem::take(&mut self.images)
            .into_values()
            .flatten()
            .collect();
        let submission = ScanSubmission::new(images, self.device.name(), self.simulation);
        info!(
            total = submission.metadata.total_images,
            simulation = self.simulation,
            "Scan completed"
        );
        Ok(submission)
    }

    /// Release the camera and any timers; the controller stays usable
    pub fn shutdown(&mut self) {
        self.release_session();
    }

    fn transition(&mut self, action: StepAction) -> Result<(), CaptureError> {
        let filled = self.filled_slots();
        let next = self
            .step
            .apply(action, &filled)
            .ok_or_else(|| self.invalid(action))?;

        debug!(from = %self.step, to = %next, %action, "Capture step transition");
        self.release_session();
        self.session_error = None;
        self.step = next;
        if next.is_capture() {
            self.acquire_session()?;
        }
        Ok(())
    }

    /// Move on from a slot whose capture is already stored
    ///
    /// A camera that fails to open for the next step does not undo the
    /// capture; the step is left without a session awaiting `retry`.
    fn advance_after_capture(&mut self) -> Result<(), CaptureError> {
        match self.transition(StepAction::Advance) {
            Err(CaptureError::Device { step, error }) => {
                warn!(%step, error = %error, "Capture kept, next camera session unavailable");
                Ok(())
            }
            other => other,
        }
    }

    fn acquire_session(&mut self) -> Result<(), CaptureError> {
        let source = match self.device.start(self.facing) {
            Ok(source) => source,
            Err(error) => {
                warn!(step = %self.step, error = %error, "Camera acquisition failed");
                self.session_error = Some(error.clone());
                return Err(CaptureError::Device {
                    step: self.step,
                    error,
                });
            }
        };
        let (width, height) = source.resolution();
        let source: SharedFrameSource = Arc::new(Mutex::new(source));
        let monitor = QualityMonitor::start(
            Arc::clone(&source),
            self.config.quality.clone(),
            self.config.monitor.clone(),
        );

        info!(
            step = %self.step,
            facing = %self.facing,
            width,
            height,
            "Camera session acquired"
        );
        self.session = Some(CameraSession {
            source,
            monitor,
            take: None,
        });
        self.session_error = None;
        Ok(())
    }

    fn release_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.release();
            info!(step = %self.step, "Camera session released");
        }
    }

    /// Close the failed session so a retry starts clean
    fn device_failure(&mut self, error: BackendError) -> CaptureError {
        warn!(step = %self.step, error = %error, "Camera failed during capture");
        self.release_session();
        self.session_error = Some(error.clone());
        CaptureError::Device {
            step: self.step,
            error,
        }
    }

    fn invalid(&self, action: StepAction) -> CaptureError {
        self.invalid_named(&action.to_string())
    }

    fn invalid_named(&self, action: &str) -> CaptureError {
        CaptureError::InvalidTransition {
            from: self.step,
            action: action.to_string(),
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.release_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::VirtualCamera;

    fn controller(camera: VirtualCamera) -> CaptureController {
        CaptureController::new(Box::new(camera), Config::default())
    }

    #[test]
    fn test_begin_acquires_one_session() {
        let camera = VirtualCamera::new();
        let handle = camera.handle();
        let mut controller = controller(camera);
        assert_eq!(handle.open_sessions(), 0);

        controller.begin().unwrap();
        assert_eq!(controller.step(), CaptureStep::Capture(CaptureSlot::first()));
        assert!(controller.has_session());
        assert_eq!(handle.open_sessions(), 1);
    }

    #[test]
    fn test_photo_advances_and_swaps_session() {
        let camera = VirtualCamera::new();
        let handle = camera.handle();
        let mut controller = controller(camera);
        controller.begin().unwrap();

        let image = controller.capture_photo().unwrap();
        assert_eq!(image.slot, CaptureSlot::first());
        assert_eq!(image.source, ImageSource::Photo);
        assert_eq!(&image.jpeg[0..2], &[0xFF, 0xD8]);
        assert_eq!(
            controller.step(),
            CaptureStep::Capture(CaptureSlot::new(Side::Left, Angle::Side))
        );
        assert_eq!(handle.open_sessions(), 1);
        assert_eq!(handle.starts(), 2);
    }

    #[test]
    fn test_device_error_then_retry() {
        let camera = VirtualCamera::new().fail_next_start(BackendError::PermissionDenied("denied".into()));
        let handle = camera.handle();
        let mut controller = controller(camera);

        let err = controller.begin().unwrap_err();
        assert!(matches!(
            err,
            CaptureError::Device {
                error: BackendError::PermissionDenied(_),
                ..
            }
        ));
        assert_eq!(controller.step(), CaptureStep::Capture(CaptureSlot::first()));
        assert!(!controller.has_session());
        assert!(matches!(controller.capture_photo(), Err(CaptureError::NoActiveSession)));

        controller.retry().unwrap();
        assert!(controller.has_session());
        assert_eq!(handle.open_sessions(), 1);
    }

    #[test]
    fn test_photo_kept_when_next_camera_fails() {
        let camera = VirtualCamera::new();
        let handle = camera.handle();
        let mut controller = controller(camera);
        controller.begin().unwrap();

        handle.fail_next_start(BackendError::Busy("in use".into()));
        let image = controller.capture_photo().unwrap();
        assert_eq!(image.slot, CaptureSlot::first());
        assert_eq!(controller.image_count(), 1);
        assert_eq!(
            controller.step(),
            CaptureStep::Capture(CaptureSlot::new(Side::Left, Angle::Side))
        );
        assert!(!controller.has_session());
        assert!(matches!(controller.session_error(), Some(BackendError::Busy(_))));

        controller.retry().unwrap();
        assert!(controller.session_error().is_none());
        assert_eq!(handle.open_sessions(), 1);
    }

    #[tokio::test]
    async fn test_take_goes_to_slot_it_started_in() {
        let frames = (0..20)
            .map(|_| crate::backends::virtual_camera::test_pattern(320, 240, 16))
            .collect();
        let camera = VirtualCamera::new().with_take(frames, 4.0);
        let mut controller = controller(camera);
        controller.begin().unwrap();
        controller.set_mode(CaptureMode::Video).unwrap();
        controller.start_recording().unwrap();

        let elsewhere = CaptureSlot::new(Side::Right, Angle::Rear);
        controller.step = CaptureStep::Capture(elsewhere);

        let VideoOutcome::Frames(images) = controller.stop_recording().await.unwrap() else {
            panic!("expected frames");
        };
        assert!(images.iter().all(|i| i.slot == CaptureSlot::first()));
        assert!(controller.images().contains_key(&CaptureSlot::first()));
        assert!(!controller.images().contains_key(&elsewhere));
    }

    #[test]
    fn test_invalid_transitions() {
        let mut controller = controller(VirtualCamera::new());
        assert!(matches!(
            controller.complete(),
            Err(CaptureError::InvalidTransition { .. })
        ));
        assert!(matches!(
            controller.retake(CaptureSlot::first()),
            Err(CaptureError::InvalidTransition { .. })
        ));
        assert!(matches!(
            controller.capture_photo(),
            Err(CaptureError::NotCapturing(CaptureStep::Instructions))
        ));
    }

    #[test]
    fn test_flip_reacquires_with_new_facing() {
        let camera = VirtualCamera::new();
        let handle = camera.handle();
        let mut controller = controller(camera);
        controller.begin().unwrap();

        let facing = controller.flip_camera().unwrap();
        assert_eq!(facing, FacingMode::User);
        assert_eq!(handle.last_facing(), Some(FacingMode::User));
        assert_eq!(handle.open_sessions(), 1);
        assert_eq!(handle.starts(), 2);
    }

    #[test]
    fn test_recording_requires_video_mode() {
        let mut controller = controller(VirtualCamera::new());
        controller.begin().unwrap();
        assert!(matches!(
            controller.start_recording(),
            Err(CaptureError::InvalidTransition { .. })
        ));

        controller.set_mode(CaptureMode::Video).unwrap();
        controller.start_recording().unwrap();
        assert!(controller.recording_state().is_recording());
        assert!(matches!(controller.start_recording(), Err(CaptureError::AlreadyRecording)));
        assert!(matches!(controller.flip_camera(), Err(CaptureError::AlreadyRecording)));
    }

    #[test]
    fn test_drop_releases_session() {
        let camera = VirtualCamera::new();
        let handle = camera.handle();
        let mut controller = controller(camera);
        controller.begin().unwrap();
        drop(controller);
        assert_eq!(handle.open_sessions(), 0);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Bounded video recording
//!
//! [`RecordingSession`] wraps a backend [`Recorder`] with a hard duration cap.
//! A watchdog loop stops the recorder once the cap is reached and keeps the
//! take until the controller collects it, so an auto-stopped take is never
//! lost. Stopping early returns whatever was recorded.

use crate::app::state::RecordingState;
use crate::backends::camera::Recorder;
use crate::backends::camera::frame_loop::{LoopAction, WorkerLoop};
use crate::backends::camera::types::{BackendError, BackendResult, RecordedTake};
use crate::constants::capture::RECORDING_WATCHDOG_INTERVAL;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

type FinishedTake = Arc<Mutex<Option<BackendResult<RecordedTake>>>>;

/// One take in progress
pub struct RecordingSession {
    recorder: Arc<Mutex<Box<dyn Recorder>>>,
    finished: FinishedTake,
    watchdog: Option<WorkerLoop>,
    started: Instant,
    cap: Duration,
}

impl RecordingSession {
    /// Start `recorder` and arm the cap
    pub fn start(mut recorder: Box<dyn Recorder>, cap: Duration) -> BackendResult<Self> {
        recorder.start()?;

        let started = Instant::now();
        let recorder = Arc::new(Mutex::new(recorder));
        let finished: FinishedTake = Arc::new(Mutex::new(None));

        // Check often enough that short caps in tests are honoured
        let interval = RECORDING_WATCHDOG_INTERVAL
            .min(cap / 4)
            .max(Duration::from_millis(1));

        let recorder_clone = Arc::clone(&recorder);
        let finished_clone = Arc::clone(&finished);
        let watchdog = WorkerLoop::every("recording-cap", interval, move || {
            if started.elapsed() < cap {
                return LoopAction::Continue;
            }

            info!(cap_secs = cap.as_secs_f64(), "Recording cap reached, stopping take");
            let result = match recorder_clone.lock() {
                Ok(mut recorder) => recorder.stop().map(|mut take| {
                    take.auto_stopped = true;
                    take
                }),
                Err(_) => Err(BackendError::Other("Recorder lock poisoned".into())),
            };
            if let Err(e) = &result {
                error!(error = %e, "Failed to stop take at cap");
            }
            if let Ok(mut slot) = finished_clone.lock() {
                *slot = Some(result);
            }
            LoopAction::Stop
        });

        info!(cap_secs = cap.as_secs_f64(), "Recording started");

        Ok(Self {
            recorder,
            finished,
            watchdog: Some(watchdog),
            started,
            cap,
        })
    }

    /// Time since the take started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed().min(self.cap)
    }

    /// True once the cap has stopped the take
    pub fn is_auto_stopped(&self) -> bool {
        self.finished.lock().map(|f| f.is_some()).unwrap_or(false)
    }

    pub fn state(&self) -> RecordingState {
        if self.is_auto_stopped() {
            RecordingState::CapReached
        } else {
            RecordingState::Recording {
                start_time: self.started,
            }
        }
    }

    /// Finish the take
    ///
    /// Returns the auto-stopped take if the cap fired, otherwise stops the
    /// recorder now.
    pub fn stop(mut self) -> BackendResult<RecordedTake> {
        if let Some(mut watchdog) = self.watchdog.take() {
            watchdog.stop();
        }

        let stashed = self
            .finished
            .lock()
            .map_err(|_| BackendError::Other("Recording state poisoned".into()))?
            .take();
        if let Some(result) = stashed {
            return result;
        }

        let take = self
            .recorder
            .lock()
            .map_err(|_| BackendError::Other("Recorder lock poisoned".into()))?
            .stop()?;

        info!(
            bytes = take.data.len(),
            secs = take.recorded_for.as_secs_f64(),
            "Recording stopped"
        );
        Ok(take)
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(mut watchdog) = self.watchdog.take() {
            watchdog.stop();
        }
        if let Ok(mut recorder) = self.recorder.lock()
            && recorder.is_recording()
        {
            debug!("Discarding abandoned take");
            if let Err(e) = recorder.stop() {
                warn!(error = %e, "Failed to stop abandoned take");
            }
        }
    }
}

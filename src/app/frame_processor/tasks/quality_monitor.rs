// SPDX-License-Identifier: GPL-3.0-only

//! Live quality monitor
//!
//! Samples the shared frame source on a fixed cadence, downsamples into a
//! pooled buffer and publishes a [`LiveQualityIndicator`] on a watch channel.
//!
//! The monitor never waits for the camera: if the operator path holds the
//! source (a still grab, a recorder being created) the tick is skipped.

use super::quality::evaluate_live;
use crate::app::frame_processor::types::{LiveQualityIndicator, QualityThresholds};
use crate::backends::camera::SharedFrameSource;
use crate::backends::camera::frame_loop::{LoopAction, WorkerLoop};
use crate::constants::monitor as defaults;
use crate::media::{BufferPool, scaler};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::TryLockError;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Monitor cadence and working resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub interval_ms: u64,
    pub sample_width: u32,
    pub sample_height: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_ms: defaults::TICK_INTERVAL.as_millis() as u64,
            sample_width: defaults::SAMPLE_WIDTH,
            sample_height: defaults::SAMPLE_HEIGHT,
        }
    }
}

impl MonitorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Periodic quality sampler bound to one capture session
pub struct QualityMonitor {
    controller: WorkerLoop,
    indicator: watch::Receiver<LiveQualityIndicator>,
    busy_ticks: Arc<AtomicU64>,
    samples: Arc<AtomicU64>,
}

impl QualityMonitor {
    /// Start sampling `source`
    pub fn start(
        source: SharedFrameSource,
        thresholds: QualityThresholds,
        settings: MonitorSettings,
    ) -> Self {
        let (sender, indicator) = watch::channel(LiveQualityIndicator::default());
        let pool = BufferPool::new(defaults::POOL_CAPACITY);
        let busy_ticks = Arc::new(AtomicU64::new(0));
        let samples = Arc::new(AtomicU64::new(0));

        let busy_clone = Arc::clone(&busy_ticks);
        let samples_clone = Arc::clone(&samples);
        let (width, height) = (settings.sample_width.max(1), settings.sample_height.max(1));

        info!(
            interval_ms = settings.interval_ms,
            width, height, "Starting quality monitor"
        );

        let controller =
            WorkerLoop::every("quality-monitor", settings.interval(), move || {
                let frame = match source.try_lock() {
                    Ok(mut guard) => guard.grab_frame(),
                    Err(TryLockError::WouldBlock) => {
                        busy_clone.fetch_add(1, Ordering::Relaxed);
                        trace!("Frame source busy, skipping quality tick");
                        return LoopAction::Continue;
                    }
                    Err(TryLockError::Poisoned(_)) => {
                        warn!("Frame source lock poisoned, stopping quality monitor");
                        return LoopAction::Stop;
                    }
                };

                let frame = match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!(error = %e, "No frame for quality tick");
                        return LoopAction::Continue;
                    }
                };

                let mut buffer = pool.acquire(width as usize * height as usize * 4);
                scaler::downsample_rgba_into(&frame, width, height, &mut buffer);
                let Some(live) = evaluate_live(&buffer, width, height, &thresholds) else {
                    debug!(len = buffer.len(), "Downsample incomplete, skipping quality tick");
                    return LoopAction::Continue;
                };
                samples_clone.fetch_add(1, Ordering::Relaxed);

                sender.send_if_modified(|current| {
                    let changed = *current != live;
                    *current = live;
                    changed
                });
                LoopAction::Continue
            });

        Self {
            controller,
            indicator,
            busy_ticks,
            samples,
        }
    }

    /// Most recent indicator
    pub fn latest(&self) -> LiveQualityIndicator {
        *self.indicator.borrow()
    }

    /// Receiver that wakes on every change of the indicator
    pub fn subscribe(&self) -> watch::Receiver<LiveQualityIndicator> {
        self.indicator.clone()
    }

    /// Ticks completed with a fresh sample
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Ticks skipped because the source was busy or the tick overran
    pub fn skipped_ticks(&self) -> u64 {
        self.busy_ticks.load(Ordering::Relaxed) + self.controller.skipped_ticks()
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Stop sampling and wait for the in-flight tick
    pub fn stop(&mut self) {
        self.controller.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{CameraFrame, FacingMode};
    use crate::backends::camera::CameraDevice;
    use crate::backends::virtual_camera::VirtualCamera;
    use std::sync::Mutex;
    use std::thread;

    fn fast() -> MonitorSettings {
        MonitorSettings {
            interval_ms: 10,
            ..MonitorSettings::default()
        }
    }

    fn wait_for_samples(monitor: &QualityMonitor, n: u64) {
        for _ in 0..200 {
            if monitor.samples() >= n {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("monitor produced {} samples", monitor.samples());
    }

    #[test]
    fn test_dark_feed_flags_brightness() {
        let dark = CameraFrame::from_rgba(320, 240, vec![15; 320 * 240 * 4]);
        let mut camera = VirtualCamera::new().with_frames(vec![dark]);
        let source: SharedFrameSource =
            Arc::new(Mutex::new(camera.start(FacingMode::Environment).unwrap()));

        let mut monitor = QualityMonitor::start(source, QualityThresholds::default(), fast());
        wait_for_samples(&monitor, 2);
        let live = monitor.latest();
        monitor.stop();

        assert!(!live.brightness_ok);
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_sharp_feed_passes() {
        let mut camera = VirtualCamera::new();
        let source: SharedFrameSource =
            Arc::new(Mutex::new(camera.start(FacingMode::Environment).unwrap()));

        let mut monitor = QualityMonitor::start(source, QualityThresholds::default(), fast());
        wait_for_samples(&monitor, 1);
        assert_eq!(monitor.latest(), LiveQualityIndicator::default());
        monitor.stop();
    }

    #[test]
    fn test_busy_source_skips_ticks() {
        let mut camera = VirtualCamera::new();
        let source: SharedFrameSource =
            Arc::new(Mutex::new(camera.start(FacingMode::Environment).unwrap()));

        let guard = source.lock().unwrap();
        let mut monitor =
            QualityMonitor::start(Arc::clone(&source), QualityThresholds::default(), fast());
        thread::sleep(Duration::from_millis(80));
        assert_eq!(monitor.samples(), 0);
        assert!(monitor.skipped_ticks() > 0);

        drop(guard);
        wait_for_samples(&monitor, 1);
        monitor.stop();
    }
}

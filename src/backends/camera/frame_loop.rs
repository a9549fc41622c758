// SPDX-License-Identifier: GPL-3.0-only

//! Background worker threads
//!
//! Every long-lived worker in the scanner (take pump, quality ticks,
//! recording-cap watchdog) runs through [`WorkerLoop`]. A worker is either
//! free-running, blocking on its own input between calls, or periodic.
//! Stopping unparks a sleeping periodic worker, so dropping the handle never
//! waits out a full period.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// What the worker body wants next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy)]
enum Schedule {
    FreeRunning,
    Every(Duration),
}

/// Flags shared between the handle and its thread
#[derive(Debug, Default)]
struct Shared {
    stop: AtomicBool,
    skipped: AtomicU64,
}

/// Handle to a worker thread; dropping it stops and joins the worker
///
/// ```ignore
/// let monitor = WorkerLoop::every("quality-monitor", Duration::from_millis(500), move || {
///     sample_live_frame();
///     LoopAction::Continue
/// });
/// drop(monitor);
/// ```
pub struct WorkerLoop {
    name: String,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerLoop {
    /// Call `body` back to back until it asks to stop or the handle stops it
    pub fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::launch(name, Schedule::FreeRunning, body)
    }

    /// Call `body` once per `interval`, starting immediately
    ///
    /// Ticks missed while `body` overran are dropped and counted, never
    /// queued.
    pub fn every<F>(name: &str, interval: Duration, body: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::launch(name, Schedule::Every(interval.max(Duration::from_millis(1))), body)
    }

    fn launch<F>(name: &str, schedule: Schedule, mut body: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker_name = name.to_string();
        info!(name, ?schedule, "Starting worker");

        let thread = thread::spawn(move || {
            let mut due = Instant::now();
            while !worker_shared.stop.load(Ordering::SeqCst) {
                if let Schedule::Every(interval) = schedule {
                    let now = Instant::now();
                    if now < due {
                        // Re-check the stop flag after every wake-up
                        thread::park_timeout(due - now);
                        continue;
                    }
                    due = next_due(due, interval, &worker_shared.skipped, &worker_name);
                }

                if body() == LoopAction::Stop {
                    debug!(name = %worker_name, "Worker finished by itself");
                    break;
                }
            }
            debug!(name = %worker_name, "Worker thread exiting");
        });

        Self {
            name: name.to_string(),
            shared,
            thread: Some(thread),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Ticks dropped because the body overran its period
    pub fn skipped_ticks(&self) -> u64 {
        self.shared.skipped.load(Ordering::Relaxed)
    }

    /// Ask the worker to stop without waiting for it
    pub fn request_stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = &self.thread {
            thread.thread().unpark();
        }
    }

    /// Stop the worker and wait for it
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the worker to end on its own
    pub fn join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // A body that stops its own loop cannot join itself
        if thread.thread().id() == thread::current().id() {
            return;
        }
        match thread.join() {
            Ok(()) => debug!(name = %self.name, "Worker joined"),
            Err(e) => warn!(name = %self.name, "Worker thread panicked: {:?}", e),
        }
    }
}

/// Next deadline after a tick that was due at `due`
fn next_due(due: Instant, interval: Duration, skipped: &AtomicU64, name: &str) -> Instant {
    let next = due + interval;
    let now = Instant::now();
    if now <= next {
        return next;
    }
    let missed = ((now - next).as_nanos() / interval.as_nanos()) as u32 + 1;
    skipped.fetch_add(missed as u64, Ordering::Relaxed);
    trace!(name, missed, "Worker fell behind, skipping ticks");
    next + interval * missed
}

impl Drop for WorkerLoop {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop();
        }
    }
}

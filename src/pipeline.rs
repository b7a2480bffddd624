//! The capture → detect → correlate → render loop.
//!
//! Runs on one dedicated thread. Each iteration is serialized: there is
//! never more than one detection in flight. Capture and detection
//! failures are absorbed (skip the iteration / count zero objects); the
//! loop only ends when the stop flag or the quit hotkey is observed,
//! checked once per iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::{CaptureRegion, CaptureSource};
use crate::detect::ObjectDetector;
use crate::input::InputState;
use crate::render::{AccuracyDisplay, DisplayUpdate};
use crate::tracker::{AccuracyLabel, AccuracyState, AccuracyTracker, ClickOutcome, NoClickPolicy};

/// Minimum pause after a failed capture, whatever the interval.
pub const CAPTURE_RETRY_FLOOR: Duration = Duration::from_millis(100);

/// Fixed parameters of the loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub region: CaptureRegion,
    /// Sleep after every iteration. Zero disables the throttle.
    pub interval: Duration,
    pub policy: NoClickPolicy,
}

/// What a finished loop hands back to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub iterations: u64,
    pub capture_failures: u64,
    pub detection_failures: u64,
    pub render_failures: u64,
    pub state: AccuracyState,
    pub accuracy: f64,
}

/// Result of a single iteration, mostly for tests and logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationReport {
    /// Capture failed; nothing else ran and any pending click stays pending.
    CaptureSkipped,
    Completed {
        object_count: usize,
        detection_failed: bool,
        click: ClickOutcome,
        accuracy: f64,
    },
}

pub struct CaptureLoop<C, D, R> {
    capture: C,
    detector: D,
    display: R,
    settings: LoopSettings,
    input: Arc<InputState>,
    stop: Arc<AtomicBool>,
    tracker: AccuracyTracker,
    iterations: u64,
    capture_failures: u64,
    detection_failures: u64,
    render_failures: u64,
}

impl<C, D, R> CaptureLoop<C, D, R>
where
    C: CaptureSource,
    D: ObjectDetector,
    R: AccuracyDisplay,
{
    pub fn new(
        capture: C,
        detector: D,
        display: R,
        settings: LoopSettings,
        input: Arc<InputState>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            capture,
            detector,
            display,
            settings,
            input,
            stop,
            tracker: AccuracyTracker::new(settings.policy),
            iterations: 0,
            capture_failures: 0,
            detection_failures: 0,
            render_failures: 0,
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire) || self.input.quit_requested()
    }

    /// Run until stopped, then render the final accuracy once.
    pub fn run(mut self) -> SessionSummary {
        log::info!(
            "[LOOP] Started, region {}, interval {}ms",
            self.settings.region,
            self.settings.interval.as_millis()
        );

        while !self.should_stop() {
            let report = self.step();

            if self.should_stop() {
                break;
            }
            let pause = match report {
                // No detection call paced this pass.
                IterationReport::CaptureSkipped => self.settings.interval.max(CAPTURE_RETRY_FLOOR),
                IterationReport::Completed { .. } => self.settings.interval,
            };
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }

        let accuracy = self.tracker.accuracy();
        self.render(accuracy, None, true);
        log::info!("[LOOP] Final {}", AccuracyLabel(accuracy));

        self.summary()
    }

    /// One iteration, without the throttle sleep.
    pub fn step(&mut self) -> IterationReport {
        self.iterations += 1;
        let iteration = self.iterations;
        let start = Instant::now();

        let frame = match self.capture.grab(&self.settings.region) {
            Ok(frame) => frame,
            Err(e) => {
                self.capture_failures += 1;
                log::warn!("[CAPTURE] Iteration {}: {}", iteration, e);
                return IterationReport::CaptureSkipped;
            }
        };
        let capture_ms = start.elapsed().as_millis();

        let (object_count, detection_failed) = match self.detector.detect(&frame) {
            Ok(detections) => (detections.len(), false),
            Err(e) => {
                self.detection_failures += 1;
                log::error!("[DETECT] Iteration {}: {}, counting 0 objects", iteration, e);
                (0, true)
            }
        };

        let click_pending = self.input.take_click();
        let previous = self.tracker.state().last_object_count;
        let (accuracy, click) = self.tracker.record_with_outcome(object_count, click_pending);

        match click {
            ClickOutcome::Hit => log::info!(
                "[LOOP] Click scored as hit ({} → {} objects), {}",
                previous,
                object_count,
                AccuracyLabel(accuracy)
            ),
            ClickOutcome::Miss => log::info!(
                "[LOOP] Click scored as miss ({} → {} objects), {}",
                previous,
                object_count,
                AccuracyLabel(accuracy)
            ),
            ClickOutcome::NoClick => {}
        }
        log::debug!(
            "[LOOP] Iteration {}: {} objects, capture {}ms, total {}ms",
            iteration,
            object_count,
            capture_ms,
            start.elapsed().as_millis()
        );

        let frame = self.display.wants_frames().then_some(frame);
        self.render(accuracy, frame, false);

        IterationReport::Completed {
            object_count,
            detection_failed,
            click,
            accuracy,
        }
    }

    fn render(&mut self, accuracy: f64, frame: Option<crate::capture::Frame>, is_final: bool) {
        let update = DisplayUpdate {
            accuracy,
            state: self.tracker.state(),
            frame,
            is_final,
        };
        if let Err(e) = self.display.show(update) {
            self.render_failures += 1;
            log::warn!("[LOOP] Iteration {}: render skipped: {}", self.iterations, e);
        }
    }

    pub fn tracker(&self) -> &AccuracyTracker {
        &self.tracker
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            iterations: self.iterations,
            capture_failures: self.capture_failures,
            detection_failures: self.detection_failures,
            render_failures: self.render_failures,
            state: self.tracker.state(),
            accuracy: self.tracker.accuracy(),
        }
    }
}

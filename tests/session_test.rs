//! Integration tests for the controller + capture loop.
//!
//! Everything external is faked: a blank screen, scripted or stalling
//! detectors, a recording display and a recording input source. No
//! display, network, or input permissions needed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use aim_lens_lib::capture::{CaptureError, CaptureRegion, CaptureSource, Frame};
use aim_lens_lib::controller::{Controller, ControllerError};
use aim_lens_lib::detect::{BoundingBox, Detection, DetectionError, ObjectDetector};
use aim_lens_lib::input::{
    InputError, InputEvent, InputSource, InputState, Key, MouseButton, QuitCombo,
};
use aim_lens_lib::pipeline::LoopSettings;
use aim_lens_lib::render::{AccuracyDisplay, DisplayUpdate, RenderError};
use aim_lens_lib::tracker::NoClickPolicy;
use image::{DynamicImage, RgbaImage};

// ── Fakes ───────────────────────────────────────────────────────────

struct BlankScreen;

impl CaptureSource for BlankScreen {
    fn grab(&mut self, region: &CaptureRegion) -> Result<Frame, CaptureError> {
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(region.width, region.height)))
    }
}

fn targets(n: usize) -> Vec<Detection> {
    vec![
        Detection {
            label: "enemy".into(),
            confidence: 0.8,
            bbox: BoundingBox { x: 1.0, y: 1.0, width: 2.0, height: 2.0 },
        };
        n
    ]
}

/// Replays counts (`None` = failed call), repeating the last one.
struct Scripted {
    counts: VecDeque<Option<usize>>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(counts: &[Option<usize>]) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                counts: counts.iter().copied().collect(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl ObjectDetector for Scripted {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = if self.counts.len() > 1 {
            self.counts.pop_front().flatten()
        } else {
            self.counts.front().copied().flatten()
        };
        next.map(targets).ok_or(DetectionError::Timeout)
    }
}

/// Takes `delay` per call, like a slow inference service.
struct Slow {
    delay: Duration,
    started: Arc<AtomicUsize>,
}

impl ObjectDetector for Slow {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(targets(1))
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<DisplayUpdate>>>);

impl Recorder {
    fn updates(&self) -> Vec<DisplayUpdate> {
        self.0.lock().unwrap().clone()
    }
}

impl AccuracyDisplay for Recorder {
    fn show(&mut self, update: DisplayUpdate) -> Result<(), RenderError> {
        self.0.lock().unwrap().push(update);
        Ok(())
    }
}

#[derive(Default)]
struct FakeHooks {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    fail: bool,
}

impl InputSource for FakeHooks {
    fn start(&mut self, _state: Arc<InputState>) -> Result<(), InputError> {
        if self.fail {
            return Err(InputError::Listen("no permission".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn settings(interval_ms: u64) -> LoopSettings {
    LoopSettings {
        region: CaptureRegion::new(0, 0, 8, 8),
        interval: Duration::from_millis(interval_ms),
        policy: NoClickPolicy::Optimistic,
    }
}

fn controller_with(hooks: FakeHooks, interval_ms: u64, join_timeout: Duration) -> Controller {
    Controller::new(
        settings(interval_ms),
        InputState::shared(QuitCombo::default()),
        Box::new(hooks),
        join_timeout,
    )
}

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn press_quit_combo(input: &InputState) {
    input.handle(InputEvent::KeyDown(Key::ControlLeft));
    input.handle(InputEvent::KeyDown(Key::AltLeft));
    input.handle(InputEvent::KeyDown(Key::F(12)));
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[test]
fn start_then_stop_returns_summary_and_stops_hooks() {
    let hooks = FakeHooks::default();
    let (starts, stops) = (Arc::clone(&hooks.starts), Arc::clone(&hooks.stops));
    let mut controller = controller_with(hooks, 5, Duration::from_secs(2));
    let (detector, calls) = Scripted::new(&[Some(3)]);
    let recorder = Recorder::default();

    controller.start(BlankScreen, detector, recorder.clone()).unwrap();
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 3));
    assert!(!controller.should_quit());

    let summary = controller.stop().expect("loop should stop in time");
    assert!(summary.iterations >= 3);
    assert_eq!(summary.state.total_clicks, 0);
    assert_eq!(summary.accuracy, 100.0);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    let updates = recorder.updates();
    assert!(updates.last().unwrap().is_final);
    assert_eq!(updates.iter().filter(|u| u.is_final).count(), 1);
}

#[test]
fn second_start_is_rejected() {
    let mut controller = controller_with(FakeHooks::default(), 5, Duration::from_secs(2));
    let (d1, _) = Scripted::new(&[Some(0)]);
    let (d2, _) = Scripted::new(&[Some(0)]);
    controller.start(BlankScreen, d1, Recorder::default()).unwrap();
    let err = controller.start(BlankScreen, d2, Recorder::default()).unwrap_err();
    assert!(matches!(err, ControllerError::AlreadyRunning));
    controller.stop();
}

#[test]
fn failing_input_hooks_prevent_the_loop_from_starting() {
    let hooks = FakeHooks {
        fail: true,
        ..Default::default()
    };
    let mut controller = controller_with(hooks, 5, Duration::from_secs(2));
    let (detector, calls) = Scripted::new(&[Some(0)]);

    let err = controller.start(BlankScreen, detector, Recorder::default()).unwrap_err();
    assert!(matches!(err, ControllerError::Input(_)));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(controller.stop().is_none());
}

// ── Click correlation through the running loop ──────────────────────

#[test]
fn clicks_are_scored_against_count_changes() {
    let mut controller = controller_with(FakeHooks::default(), 0, Duration::from_secs(2));
    let input = Arc::clone(controller.input());
    let (detector, calls) = Scripted::new(&[Some(4)]);
    controller.start(BlankScreen, detector, Recorder::default()).unwrap();
    // Past the first iteration, whose 0 -> 4 jump would score a hit.
    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 2));

    // Count never changes from here, so every click is a miss.
    for _ in 0..3 {
        let seen = calls.load(Ordering::SeqCst);
        input.handle(InputEvent::ButtonDown(MouseButton::Left));
        assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= seen + 2));
    }

    let summary = controller.stop().unwrap();
    assert_eq!(summary.state.total_clicks, 3);
    assert_eq!(summary.state.accurate_clicks, 0);
    assert_eq!(summary.accuracy, 0.0);
}

// ── Failure handling ────────────────────────────────────────────────

#[test]
fn repeated_detection_failures_do_not_stop_the_loop() {
    let mut controller = controller_with(FakeHooks::default(), 1, Duration::from_secs(2));
    let input = Arc::clone(controller.input());
    let (detector, calls) = Scripted::new(&[Some(2), None, None, Some(1)]);
    let recorder = Recorder::default();
    controller.start(BlankScreen, detector, recorder.clone()).unwrap();

    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 1));
    input.mark_click();
    assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) >= 6));
    assert!(!controller.should_quit(), "loop must survive failed detections");

    let summary = controller.stop().unwrap();
    assert_eq!(summary.detection_failures, 2);
    assert_eq!(summary.state.total_clicks, 1);
    assert!(summary.state.accurate_clicks <= summary.state.total_clicks);
    assert_eq!(summary.state.last_object_count, 1);
}

// ── Shutdown ────────────────────────────────────────────────────────

#[test]
fn quit_mid_iteration_finishes_it_and_renders_once_more() {
    let started = Arc::new(AtomicUsize::new(0));
    let detector = Slow {
        delay: Duration::from_millis(200),
        started: Arc::clone(&started),
    };
    let mut controller = controller_with(FakeHooks::default(), 0, Duration::from_secs(3));
    let input = Arc::clone(controller.input());
    let recorder = Recorder::default();
    controller.start(BlankScreen, detector, recorder.clone()).unwrap();

    assert!(wait_until(Duration::from_secs(2), || started.load(Ordering::SeqCst) >= 1));
    press_quit_combo(&input);
    assert!(input.quit_requested());

    assert!(wait_until(Duration::from_secs(2), || controller.should_quit()));
    let summary = controller.stop().unwrap();

    // The in-flight iteration completed; no new one started after quit.
    assert_eq!(summary.iterations, 1);
    assert_eq!(started.load(Ordering::SeqCst), 1);

    let updates = recorder.updates();
    assert_eq!(updates.len(), 2);
    assert!(!updates[0].is_final);
    assert!(updates[1].is_final);
}

#[test]
fn worker_exit_is_noticed_by_the_main_thread_pump() {
    let mut controller = controller_with(FakeHooks::default(), 5, Duration::from_secs(2));
    let input = Arc::clone(controller.input());
    let (detector, _) = Scripted::new(&[Some(1)]);
    controller.start(BlankScreen, detector, Recorder::default()).unwrap();

    let presser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        press_quit_combo(&input);
    });
    let start = Instant::now();
    controller.wait_for_quit();
    assert!(start.elapsed() < Duration::from_secs(2));
    presser.join().unwrap();

    assert!(controller.stop().is_some());
}

#[test]
fn stop_does_not_hang_on_a_stuck_detector() {
    let started = Arc::new(AtomicUsize::new(0));
    let detector = Slow {
        delay: Duration::from_secs(3),
        started: Arc::clone(&started),
    };
    let mut controller = controller_with(FakeHooks::default(), 0, Duration::from_millis(100));
    controller.start(BlankScreen, detector, Recorder::default()).unwrap();
    assert!(wait_until(Duration::from_secs(2), || started.load(Ordering::SeqCst) >= 1));

    let start = Instant::now();
    let summary = controller.stop();
    assert!(summary.is_none(), "stuck worker should be detached");
    assert!(start.elapsed() < Duration::from_secs(1));
}

//! Lifecycle: start the input hooks, then the capture thread; wait for
//! the quit signal; stop everything with a bounded wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::capture::CaptureSource;
use crate::detect::ObjectDetector;
use crate::input::{InputError, InputSource, InputState};
use crate::pipeline::{CaptureLoop, LoopSettings, SessionSummary};
use crate::render::AccuracyDisplay;

/// Poll period of the headless main-thread wait.
const QUIT_POLL: Duration = Duration::from_millis(10);

struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<SessionSummary>,
    /// Filled in if the worker finished on its own (quit hotkey).
    summary: Option<SessionSummary>,
}

pub struct Controller {
    settings: LoopSettings,
    input: Arc<InputState>,
    input_source: Box<dyn InputSource>,
    stop: Arc<AtomicBool>,
    join_timeout: Duration,
    worker: Option<Worker>,
}

impl Controller {
    pub fn new(
        settings: LoopSettings,
        input: Arc<InputState>,
        input_source: Box<dyn InputSource>,
        join_timeout: Duration,
    ) -> Self {
        Self {
            settings,
            input,
            input_source,
            stop: Arc::new(AtomicBool::new(false)),
            join_timeout,
            worker: None,
        }
    }

    pub fn input(&self) -> &Arc<InputState> {
        &self.input
    }

    /// Upper bound on how long `stop` waits for the capture thread.
    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }

    /// Start listening for input, then start the capture thread.
    ///
    /// A click in the gap between the two is attributed to the first
    /// iteration; one lost before the hooks are up is simply not counted.
    pub fn start<C, D, R>(&mut self, capture: C, detector: D, display: R) -> Result<(), ControllerError>
    where
        C: CaptureSource + 'static,
        D: ObjectDetector + 'static,
        R: AccuracyDisplay + 'static,
    {
        if self.worker.is_some() {
            return Err(ControllerError::AlreadyRunning);
        }

        self.input_source.start(Arc::clone(&self.input))?;

        self.stop.store(false, Ordering::Release);
        let capture_loop = CaptureLoop::new(
            capture,
            detector,
            display,
            self.settings,
            Arc::clone(&self.input),
            Arc::clone(&self.stop),
        );
        let (done_tx, done_rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("capture-loop".into())
            .spawn(move || {
                let summary = capture_loop.run();
                let _ = done_tx.send(summary);
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.input_source.stop();
                return Err(ControllerError::Spawn(e.to_string()));
            }
        };

        self.worker = Some(Worker {
            handle,
            done: done_rx,
            summary: None,
        });
        log::info!("[CONTROLLER] Capture loop started");
        Ok(())
    }

    /// True once quit was requested or the capture thread has exited.
    pub fn should_quit(&mut self) -> bool {
        if self.input.quit_requested() {
            return true;
        }
        match self.worker.as_mut() {
            None => true,
            Some(worker) if worker.summary.is_some() => true,
            Some(worker) => match worker.done.try_recv() {
                Ok(summary) => {
                    worker.summary = Some(summary);
                    true
                }
                Err(TryRecvError::Empty) => false,
                // Sender dropped without a summary: the loop panicked.
                Err(TryRecvError::Disconnected) => true,
            },
        }
    }

    /// Main-thread pump for the headless mode: block until quit.
    pub fn wait_for_quit(&mut self) {
        while !self.should_quit() {
            thread::sleep(QUIT_POLL);
        }
    }

    /// Stop the capture thread and the input hooks.
    ///
    /// Waits at most `join_timeout` for the thread; a detection call
    /// stuck past its own timeout leaves the thread detached rather than
    /// hanging shutdown. Returns the session summary when the thread
    /// finished in time.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        let worker = self.worker.take()?;
        self.stop.store(true, Ordering::Release);

        let summary = match worker.summary {
            Some(summary) => Some(summary),
            None => match worker.done.recv_timeout(self.join_timeout) {
                Ok(summary) => Some(summary),
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "[CONTROLLER] Capture loop did not stop within {}ms, detaching",
                        self.join_timeout.as_millis()
                    );
                    None
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!("[CONTROLLER] Capture loop exited without a summary");
                    None
                }
            },
        };

        // The summary is sent as the thread's last act, so this join is
        // immediate. Skip it when the thread is still running.
        if summary.is_some() || worker.handle.is_finished() {
            if worker.handle.join().is_err() {
                log::error!("[CONTROLLER] Capture loop panicked");
            }
        }

        self.input_source.stop();

        if let Some(s) = &summary {
            log::info!(
                "[CONTROLLER] Stopped after {} iterations: {}/{} accurate clicks, {:.2}% ({} capture / {} detection failures)",
                s.iterations,
                s.state.accurate_clicks,
                s.state.total_clicks,
                s.accuracy,
                s.capture_failures,
                s.detection_failures
            );
        }
        summary
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Capture loop is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Capture thread could not be spawned: {0}")]
    Spawn(String),
}

//! Aim Lens: application entry point.
//!
//! This is the app shell that wires together:
//! - Configuration and logging (config.rs, logging.rs)
//! - Screen capture domain (capture/)
//! - Object detection client (detect/)
//! - Global input hooks (input/)
//! - The capture → detect → correlate loop (pipeline.rs, tracker.rs)
//! - Presentation: Tauri overlay, debug window, or log only (render/)
//! - Lifecycle (controller.rs)

pub mod capture;
pub mod config;
pub mod controller;
pub mod detect;
pub mod input;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod tracker;
#[cfg(feature = "overlay")]
mod tray;

use capture::{CaptureError, CaptureSource, CropError};
use config::{Config, ConfigError, DisplayMode};
use controller::{Controller, ControllerError};
use detect::{DetectionClient, DetectionError, RemoteDetector};
use input::{InputSource, InputState};
use pipeline::{LoopSettings, SessionSummary};
use render::RenderError;

/// Anything that stops the app before (or while) it comes up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Display unavailable: {0}")]
    Capture(#[from] CaptureError),

    #[error("Capture region does not fit the primary display: {0}")]
    Region(#[from] CropError),

    #[error("Detection client setup failed: {0}")]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Overlay failed: {0}")]
    Overlay(String),

    #[error("{0} support is not compiled into this build")]
    Unsupported(&'static str),
}

/// Load configuration, bring everything up, block until quit.
///
/// Returns the session summary when the capture thread stopped in time.
/// The overlay mode hands the main thread to Tauri, which exits the
/// process itself after shutdown.
pub fn run() -> Result<Option<SessionSummary>, StartupError> {
    let dotenv = config::load_dotenv();
    let config = Config::from_env();

    let log_file = match &config {
        Ok(cfg) => cfg.log_file.clone(),
        Err(_) => Some(config::DEFAULT_LOG_FILE.into()),
    };
    logging::init(log_file.as_deref());

    for source in dotenv {
        match source {
            Ok(path) => log::info!("[CONFIG] Loaded environment from {}", path.display()),
            Err(e) => log::warn!("[CONFIG] Could not load .env: {}", e),
        }
    }

    let config = config?;
    log::info!("Aim Lens starting up");
    log::info!("[CONFIG] {:?}", config.detection);

    launch(config)
}

#[cfg(feature = "screen-capture")]
fn launch(config: Config) -> Result<Option<SessionSummary>, StartupError> {
    let display = capture::primary_display_size()?;
    let region = config.region.resolve(display)?;
    log::info!(
        "[CAPTURE] Primary display {}x{}, capturing {}",
        display.0,
        display.1,
        region
    );
    start_session(config, region, capture::ScreenCapture::new())
}

#[cfg(not(feature = "screen-capture"))]
fn launch(_config: Config) -> Result<Option<SessionSummary>, StartupError> {
    Err(StartupError::Unsupported("Screen capture"))
}

/// Wire the controller for the configured display mode and run it.
pub fn start_session<C>(
    config: Config,
    region: capture::CaptureRegion,
    capture: C,
) -> Result<Option<SessionSummary>, StartupError>
where
    C: CaptureSource + 'static,
{
    let settings = LoopSettings {
        region,
        interval: config.capture_interval,
        policy: config.no_click_policy,
    };
    let input = InputState::shared(config.quit_combo);
    let controller = Controller::new(settings, input, input_source(), config.join_timeout());

    let client = DetectionClient::new(&config.detection)?;
    log::info!("[DETECT] Using model endpoint {}", client.model_url());
    let detector = RemoteDetector::new(client)?;

    match config.display_mode {
        DisplayMode::Headless => run_headless(controller, capture, detector),
        DisplayMode::Window => run_window(controller, capture, detector, region),
        DisplayMode::Overlay => run_overlay(controller, capture, detector),
    }
}

#[cfg(feature = "input-hooks")]
fn input_source() -> Box<dyn InputSource> {
    Box::new(input::GlobalInputMonitor::new())
}

#[cfg(not(feature = "input-hooks"))]
fn input_source() -> Box<dyn InputSource> {
    Box::new(input::NoInput)
}

fn run_headless<C: CaptureSource + 'static>(
    mut controller: Controller,
    capture: C,
    detector: RemoteDetector,
) -> Result<Option<SessionSummary>, StartupError> {
    controller.start(capture, detector, render::LogDisplay::default())?;
    controller.wait_for_quit();
    Ok(controller.stop())
}

#[cfg(feature = "debug-window")]
fn run_window<C: CaptureSource + 'static>(
    mut controller: Controller,
    capture: C,
    detector: RemoteDetector,
    region: capture::CaptureRegion,
) -> Result<Option<SessionSummary>, StartupError> {
    let latest = render::LatestUpdate::shared();
    let display = render::SlotDisplay::new(std::sync::Arc::clone(&latest), true);
    controller.start(capture, detector, display)?;

    let pumped = render::window::run_debug_window(&mut controller, &latest, region);
    let summary = controller.stop();
    pumped?;
    Ok(summary)
}

#[cfg(not(feature = "debug-window"))]
fn run_window<C: CaptureSource + 'static>(
    _controller: Controller,
    _capture: C,
    _detector: RemoteDetector,
    _region: capture::CaptureRegion,
) -> Result<Option<SessionSummary>, StartupError> {
    Err(StartupError::Unsupported("Debug window"))
}

#[cfg(feature = "overlay")]
fn run_overlay<C: CaptureSource + 'static>(
    mut controller: Controller,
    capture: C,
    detector: RemoteDetector,
) -> Result<Option<SessionSummary>, StartupError> {
    use std::sync::Arc;
    use std::time::Duration;

    let app = tauri::Builder::default()
        .build(tauri::generate_context!())
        .map_err(|e| StartupError::Overlay(e.to_string()))?;
    let handle = app.handle().clone();

    render::overlay::open_overlay_window(&handle)
        .map_err(|e| StartupError::Overlay(e.to_string()))?;
    tray::setup_tray(&handle, Arc::clone(controller.input()))
        .map_err(|e| StartupError::Overlay(e.to_string()))?;

    controller.start(capture, detector, render::overlay::OverlayDisplay::new(handle.clone()))?;

    // The Tauri loop owns the main thread; this watcher turns the quit
    // hotkey into an exit request on it.
    let input = Arc::clone(controller.input());
    let watcher_handle = handle.clone();
    std::thread::Builder::new()
        .name("quit-watch".into())
        .spawn(move || {
            while !input.quit_requested() {
                std::thread::sleep(Duration::from_millis(10));
            }
            watcher_handle.exit(0);
        })
        .map_err(|e| StartupError::Overlay(e.to_string()))?;

    log::info!("[OVERLAY] Running, quit with the hotkey or the tray menu");

    let mut controller = Some(controller);
    app.run(move |_app, event| match event {
        tauri::RunEvent::ExitRequested { .. } => {
            if let Some(c) = controller.as_ref() {
                c.input().request_quit();
            }
        }
        tauri::RunEvent::Exit => {
            if let Some(mut c) = controller.take() {
                c.stop();
            }
        }
        _ => {}
    });

    Ok(None)
}

#[cfg(not(feature = "overlay"))]
fn run_overlay<C: CaptureSource + 'static>(
    _controller: Controller,
    _capture: C,
    _detector: RemoteDetector,
) -> Result<Option<SessionSummary>, StartupError> {
    Err(StartupError::Unsupported("Overlay"))
}

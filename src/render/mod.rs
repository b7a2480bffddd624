//! Presentation of the running accuracy.
//!
//! The capture loop pushes a [`DisplayUpdate`] through an
//! [`AccuracyDisplay`] once per iteration. Implementations must return
//! immediately: they hand the update to whatever owns the screen surface
//! (the Tauri event loop, the debug window's main-thread pump) and never
//! draw on the capture thread.

#[cfg(feature = "overlay")]
pub mod overlay;
#[cfg(feature = "debug-window")]
pub mod window;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::capture::Frame;
use crate::tracker::{AccuracyLabel, AccuracyState};

/// What one render request carries.
#[derive(Debug, Clone)]
pub struct DisplayUpdate {
    pub accuracy: f64,
    pub state: AccuracyState,
    /// The frame this accuracy was computed from, only for displays
    /// that asked for it.
    pub frame: Option<Frame>,
    /// Set on the last update before the capture loop exits.
    pub is_final: bool,
}

impl DisplayUpdate {
    pub fn label(&self) -> String {
        AccuracyLabel(self.accuracy).to_string()
    }
}

pub trait AccuracyDisplay: Send {
    /// Fire-and-forget hand-off of the latest value.
    fn show(&mut self, update: DisplayUpdate) -> Result<(), RenderError>;

    /// Whether updates should carry the captured frame.
    fn wants_frames(&self) -> bool {
        false
    }
}

/// Logs the accuracy instead of drawing it. Used headless.
#[derive(Debug, Default)]
pub struct LogDisplay {
    last_shown: Option<AccuracyState>,
}

impl AccuracyDisplay for LogDisplay {
    fn show(&mut self, update: DisplayUpdate) -> Result<(), RenderError> {
        if update.is_final {
            log::info!("[DISPLAY] {} (final)", update.label());
        } else if self.last_shown != Some(update.state) {
            log::info!(
                "[DISPLAY] {} ({}/{} clicks)",
                update.label(),
                update.state.accurate_clicks,
                update.state.total_clicks
            );
        }
        self.last_shown = Some(update.state);
        Ok(())
    }
}

/// Single-slot mailbox between the capture thread and a main-thread
/// window: each new update replaces the previous one unread.
#[derive(Debug, Default)]
pub struct LatestUpdate {
    slot: Mutex<Option<DisplayUpdate>>,
}

impl LatestUpdate {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, update: DisplayUpdate) -> Result<(), RenderError> {
        let mut guard = self.slot.lock().map_err(|_| RenderError::Poisoned)?;
        *guard = Some(update);
        Ok(())
    }

    pub fn take(&self) -> Option<DisplayUpdate> {
        self.slot.lock().ok().and_then(|mut guard| guard.take())
    }

    /// Keep handing slot contents to `pump` until the final update has
    /// been passed on, `pump` returns `false`, or `timeout` runs out.
    ///
    /// `pump` also sees `None` between updates so a window can keep
    /// servicing its event queue. Returns whether the final update was
    /// delivered.
    pub fn drain_until_final<F>(&self, timeout: Duration, mut pump: F) -> Result<bool, RenderError>
    where
        F: FnMut(Option<DisplayUpdate>) -> Result<bool, RenderError>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let update = self.take();
            let is_final = update.as_ref().is_some_and(|u| u.is_final);
            let keep_going = pump(update)?;
            if is_final {
                return Ok(true);
            }
            if !keep_going || Instant::now() >= deadline {
                return Ok(false);
            }
        }
    }
}

/// Producer half of [`LatestUpdate`].
pub struct SlotDisplay {
    slot: Arc<LatestUpdate>,
    with_frames: bool,
}

impl SlotDisplay {
    pub fn new(slot: Arc<LatestUpdate>, with_frames: bool) -> Self {
        Self { slot, with_frames }
    }
}

impl AccuracyDisplay for SlotDisplay {
    fn show(&mut self, update: DisplayUpdate) -> Result<(), RenderError> {
        self.slot.put(update)
    }

    fn wants_frames(&self) -> bool {
        self.with_frames
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Overlay event could not be delivered: {0}")]
    Emit(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("Display mailbox poisoned by a panicked thread")]
    Poisoned,
}

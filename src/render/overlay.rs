//! Transparent overlay window (Tauri).
//!
//! The window is fullscreen, undecorated, transparent, always on top and
//! ignores the cursor, so the game underneath keeps every click. The
//! page in `ui/` only draws the text it receives via `accuracy-updated`.

use serde::Serialize;
use tauri::{AppHandle, Emitter, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

use super::{AccuracyDisplay, DisplayUpdate, RenderError};

pub const OVERLAY_LABEL: &str = "overlay";
pub const ACCURACY_EVENT: &str = "accuracy-updated";

/// Event payload consumed by `ui/index.html`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyPayload {
    pub text: String,
    pub accuracy: f64,
    pub total_clicks: u64,
    pub accurate_clicks: u64,
    pub is_final: bool,
}

impl From<&DisplayUpdate> for AccuracyPayload {
    fn from(update: &DisplayUpdate) -> Self {
        Self {
            text: update.label(),
            accuracy: update.accuracy,
            total_clicks: update.state.total_clicks,
            accurate_clicks: update.state.accurate_clicks,
            is_final: update.is_final,
        }
    }
}

/// Forwards updates to the overlay webview. `emit` only queues the event
/// on the Tauri loop, so the capture thread never waits on drawing.
pub struct OverlayDisplay {
    app: AppHandle,
}

impl OverlayDisplay {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl AccuracyDisplay for OverlayDisplay {
    fn show(&mut self, update: DisplayUpdate) -> Result<(), RenderError> {
        self.app
            .emit(ACCURACY_EVENT, AccuracyPayload::from(&update))
            .map_err(|e| RenderError::Emit(e.to_string()))
    }
}

/// Create the click-through overlay window.
pub fn open_overlay_window(app: &AppHandle) -> Result<WebviewWindow, Box<dyn std::error::Error>> {
    let window = WebviewWindowBuilder::new(app, OVERLAY_LABEL, WebviewUrl::App("index.html".into()))
        .fullscreen(true)
        .transparent(true)
        .decorations(false)
        .always_on_top(true)
        .skip_taskbar(true)
        .focused(false)
        .shadow(false)
        .title("Accuracy Overlay")
        .build()?;

    window.set_ignore_cursor_events(true)?;

    log::info!("[OVERLAY] Overlay window created");
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::AccuracyState;

    #[test]
    fn payload_serializes_camel_case() {
        let update = DisplayUpdate {
            accuracy: 75.0,
            state: AccuracyState {
                total_clicks: 4,
                accurate_clicks: 3,
                last_object_count: 2,
            },
            frame: None,
            is_final: false,
        };
        let json = serde_json::to_value(AccuracyPayload::from(&update)).unwrap();
        assert_eq!(json["text"], "Accuracy: 75.00%");
        assert_eq!(json["totalClicks"], 4);
        assert_eq!(json["accurateClicks"], 3);
        assert_eq!(json["isFinal"], false);
    }
}

//! System tray icon with a Quit item.
//!
//! The overlay window ignores the cursor, so the tray is the only
//! clickable surface in overlay mode. Quitting goes through the same
//! quit flag as the hotkey so the capture loop renders its final value.

use std::sync::Arc;

use tauri::{
    image::Image as TauriImage,
    menu::{MenuBuilder, MenuItemBuilder},
    tray::TrayIconBuilder,
    AppHandle,
};

use crate::input::{InputState, Key, QuitCombo};

/// Sets up the tray icon and its menu.
pub fn setup_tray(app: &AppHandle, input: Arc<InputState>) -> Result<(), Box<dyn std::error::Error>> {
    let quit_item = MenuItemBuilder::with_id("quit", "Quit Aim Lens").build(app)?;
    let menu = MenuBuilder::new(app).item(&quit_item).build()?;

    // Decode the PNG icon to RGBA for Tauri's Image type
    let icon_bytes = include_bytes!("../icons/32x32.png");
    let icon_img = image::load_from_memory(icon_bytes)
        .map_err(|e| format!("Failed to decode tray icon: {}", e))?;
    let rgba = icon_img.to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    let tray_icon = TauriImage::new_owned(rgba.into_raw(), w, h);

    let _tray = TrayIconBuilder::new()
        .icon(tray_icon)
        .tooltip(format!("Aim Lens ({} to quit)", describe_combo(input.combo())))
        .menu(&menu)
        .on_menu_event(move |app, event| {
            if event.id() == "quit" {
                log::info!("[TRAY] Quit requested from tray menu");
                input.request_quit();
                app.exit(0);
            }
        })
        .build(app)?;

    Ok(())
}

fn describe_combo(combo: QuitCombo) -> String {
    let mut parts = Vec::new();
    if combo.ctrl {
        parts.push("Ctrl".to_string());
    }
    if combo.alt {
        parts.push("Alt".to_string());
    }
    parts.push(match combo.key {
        Key::Escape => "Esc".to_string(),
        Key::F(n) => format!("F{}", n),
        Key::Char(c) => c.to_ascii_uppercase().to_string(),
        _ => "?".to_string(),
    });
    parts.join("+")
}

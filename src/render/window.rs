//! Fallback presentation: an ordinary window (`minifb`) showing the
//! latest captured frame with the accuracy burned into it.
//!
//! Used where no transparent overlay is available. The window lives on
//! the main thread; the capture thread only fills a [`LatestUpdate`].

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};
use minifb::{Key, ScaleMode, Window, WindowOptions};

use super::{DisplayUpdate, LatestUpdate, RenderError};
use crate::capture::CaptureRegion;
use crate::controller::Controller;

const TEXT_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const TEXT_SCALE: u32 = 3;
const MARGIN: i32 = 10;

/// Largest window edge; big regions are shown scaled down.
const MAX_WINDOW_EDGE: u32 = 1280;

/// Main-thread pump: redraw on every new update, stop on Esc, window
/// close, or the controller's quit condition. On a quit with the window
/// still open, keep pumping until the capture loop's final value is on
/// screen.
pub fn run_debug_window(
    controller: &mut Controller,
    latest: &LatestUpdate,
    region: CaptureRegion,
) -> Result<(), RenderError> {
    let (win_w, win_h) = window_size(region);
    let mut window = Window::new(
        "Aim Lens: Accuracy",
        win_w as usize,
        win_h as usize,
        WindowOptions {
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        },
    )
    .map_err(|e| RenderError::Window(e.to_string()))?;
    window.set_target_fps(100);

    let mut surface = Surface::new(region);

    log::info!("[WINDOW] Debug window open ({}x{})", win_w, win_h);

    loop {
        if !window.is_open() {
            log::info!("[WINDOW] Window closed");
            controller.input().request_quit();
            return Ok(());
        }
        if window.is_key_down(Key::Escape) {
            log::info!("[WINDOW] Escape pressed");
            controller.input().request_quit();
            break;
        }
        if controller.should_quit() {
            break;
        }
        surface.present(&mut window, latest.take())?;
    }

    let shown = latest.drain_until_final(controller.join_timeout(), |update| {
        surface.present(&mut window, update)?;
        Ok(window.is_open())
    })?;
    if !shown {
        log::warn!("[WINDOW] Final accuracy not received before the window went away");
    }
    Ok(())
}

/// Pixel buffer for the window, sized from the last frame drawn.
struct Surface {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl Surface {
    fn new(region: CaptureRegion) -> Self {
        Self {
            buffer: vec![0; (region.width * region.height) as usize],
            width: region.width as usize,
            height: region.height as usize,
        }
    }

    /// Draw `update` if there is one, otherwise just service the window.
    fn present(&mut self, window: &mut Window, update: Option<DisplayUpdate>) -> Result<(), RenderError> {
        let Some(update) = update else {
            window.update();
            return Ok(());
        };

        let mut canvas = match update.frame {
            Some(ref frame) => frame.to_rgba8(),
            None => RgbaImage::new(self.width as u32, self.height as u32),
        };
        let y = canvas.height() as i32 - MARGIN - 8 * TEXT_SCALE as i32;
        draw_text(&mut canvas, MARGIN, y, &update.label(), TEXT_COLOR, TEXT_SCALE);

        self.width = canvas.width() as usize;
        self.height = canvas.height() as usize;
        pack_rgb(&canvas, &mut self.buffer);
        window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| RenderError::Window(e.to_string()))
    }
}

fn window_size(region: CaptureRegion) -> (u32, u32) {
    let longest = region.width.max(region.height).max(1);
    if longest <= MAX_WINDOW_EDGE {
        return (region.width, region.height);
    }
    let scale = MAX_WINDOW_EDGE as f64 / longest as f64;
    (
        ((region.width as f64 * scale) as u32).max(1),
        ((region.height as f64 * scale) as u32).max(1),
    )
}

/// Pack RGBA pixels as minifb's `0x00RRGGBB`.
fn pack_rgb(img: &RgbaImage, buffer: &mut Vec<u32>) {
    buffer.clear();
    buffer.extend(
        img.pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
    );
}

/// Draw `text` with the 8×8 bitmap font, each glyph pixel a
/// `scale`×`scale` block. Pixels outside the image are clipped.
pub fn draw_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: u32) {
    let scale_i = scale.max(1) as i32;
    let mut cursor_x = x;
    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += 8 * scale_i;
            continue;
        };
        for (row_idx, row) in glyph.iter().enumerate() {
            for col_idx in 0..8 {
                if (row >> col_idx) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col_idx * scale_i;
                let py = y + row_idx as i32 * scale_i;
                for sy in 0..scale_i {
                    for sx in 0..scale_i {
                        let (tx, ty) = (px + sx, py + sy);
                        if tx >= 0 && ty >= 0 && (tx as u32) < img.width() && (ty as u32) < img.height() {
                            img.put_pixel(tx as u32, ty as u32, color);
                        }
                    }
                }
            }
        }
        cursor_x += 8 * scale_i;
    }
}

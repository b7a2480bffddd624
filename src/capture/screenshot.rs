//! Primary-monitor capture using the `xcap` crate.
//!
//! This is the infrastructure layer; it talks to the OS.
//! The monitor is looked up again on every grab so an unplugged or
//! asleep display only fails that iteration.

use image::DynamicImage;
use xcap::Monitor;

use super::{crop_to_region, CaptureError, CaptureRegion, CaptureSource, Frame};

/// Grabs the primary monitor and crops it to the requested region.
#[derive(Debug, Default)]
pub struct ScreenCapture;

impl ScreenCapture {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureSource for ScreenCapture {
    fn grab(&mut self, region: &CaptureRegion) -> Result<Frame, CaptureError> {
        let monitor = primary_monitor()?;
        let image = monitor
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

        Ok(crop_to_region(DynamicImage::ImageRgba8(image), region)?)
    }
}

/// Size of the primary display in physical pixels.
pub fn primary_display_size() -> Result<(u32, u32), CaptureError> {
    let monitor = primary_monitor()?;
    let width = monitor
        .width()
        .map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
    let height = monitor
        .height()
        .map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
    Ok((width, height))
}

fn primary_monitor() -> Result<Monitor, CaptureError> {
    let mut monitors =
        Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;

    let index = monitors
        .iter()
        .position(|m| m.is_primary().unwrap_or(false))
        // Fallback: if no monitor reports as primary, use the first one
        .or(if monitors.is_empty() { None } else { Some(0) })
        .ok_or(CaptureError::NoPrimaryMonitor)?;

    Ok(monitors.swap_remove(index))
}

//! Screen capture domain: public API.
//!
//! The capture loop only sees the [`CaptureSource`] trait. The xcap
//! backend lives in `screenshot.rs`; region math lives in `region.rs`.

mod region;
#[cfg(feature = "screen-capture")]
mod screenshot;

pub use region::{crop_to_region, CaptureRegion, CropError, RegionParseError, RegionSpec};
#[cfg(feature = "screen-capture")]
pub use screenshot::{primary_display_size, ScreenCapture};

use image::DynamicImage;

/// One captured bitmap. Owned by the loop iteration that grabbed it.
pub type Frame = DynamicImage;

/// Produces a fresh bitmap of the configured region on every call.
pub trait CaptureSource: Send {
    fn grab(&mut self, region: &CaptureRegion) -> Result<Frame, CaptureError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No primary monitor found")]
    NoPrimaryMonitor,

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error(transparent)]
    Region(#[from] CropError),
}

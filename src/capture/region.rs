//! Pure capture-region logic, functional core.
//!
//! This module has zero infrastructure dependencies.
//! It resolves the configured region against the display size and crops
//! full-monitor bitmaps down to it.

use image::DynamicImage;
use std::fmt;
use std::str::FromStr;

/// Rectangle in screen pixels, relative to the primary display's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The whole display.
    pub fn full(display: (u32, u32)) -> Self {
        Self::new(0, 0, display.0, display.1)
    }

    /// A `width`×`height` rectangle centred on the display.
    pub fn centered(display: (u32, u32), width: u32, height: u32) -> Self {
        Self::new(
            display.0.saturating_sub(width) / 2,
            display.1.saturating_sub(height) / 2,
            width,
            height,
        )
    }

    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    /// Fails if the region is empty or sticks out of a `display`-sized area.
    pub fn validate(&self, display: (u32, u32)) -> Result<(), CropError> {
        if self.width == 0 || self.height == 0 {
            return Err(CropError::ZeroDimension);
        }
        if self.right() > display.0 as u64 || self.bottom() > display.1 as u64 {
            return Err(CropError::OutOfBounds {
                requested: (self.left, self.top, self.width, self.height),
                image_size: display,
            });
        }
        Ok(())
    }

    /// True when the region spans the whole `display`.
    pub fn covers(&self, display: (u32, u32)) -> bool {
        *self == Self::full(display)
    }
}

impl fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at {},{}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Region as written in configuration, before the display size is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionSpec {
    /// Entire primary display.
    #[default]
    FullScreen,
    /// Explicit rectangle; must fit the display.
    Explicit(CaptureRegion),
    /// Rectangle of this size centred on the display.
    Centered { width: u32, height: u32 },
}

impl RegionSpec {
    /// Turn the region spec into a concrete rectangle for a display of the given
    /// size, rejecting anything that does not fit.
    pub fn resolve(&self, display: (u32, u32)) -> Result<CaptureRegion, CropError> {
        let region = match *self {
            RegionSpec::FullScreen => CaptureRegion::full(display),
            RegionSpec::Explicit(r) => r,
            RegionSpec::Centered { width, height } => {
                CaptureRegion::centered(display, width, height)
            }
        };
        region.validate(display)?;
        Ok(region)
    }
}

impl FromStr for RegionSpec {
    type Err = RegionParseError;

    /// `fullscreen`, `left,top,width,height` or `center:WIDTHxHEIGHT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("fullscreen") {
            return Ok(RegionSpec::FullScreen);
        }

        let bad = || RegionParseError(s.to_string());

        if let Some(size) = s
            .strip_prefix("center:")
            .or_else(|| s.strip_prefix("centre:"))
        {
            let (w, h) = size.split_once(['x', 'X']).ok_or_else(bad)?;
            return Ok(RegionSpec::Centered {
                width: w.trim().parse().map_err(|_| bad())?,
                height: h.trim().parse().map_err(|_| bad())?,
            });
        }

        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| bad())?;
        match parts.as_slice() {
            &[left, top, width, height] => Ok(RegionSpec::Explicit(CaptureRegion::new(
                left, top, width, height,
            ))),
            _ => Err(bad()),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid capture region '{0}' (expected fullscreen, left,top,width,height or center:WxH)")]
pub struct RegionParseError(pub String);

/// Crops a full-display `DynamicImage` down to `region`.
///
/// This is a pure function with no side effects. Returns the image
/// untouched when the region already covers all of it.
pub fn crop_to_region(
    image: DynamicImage,
    region: &CaptureRegion,
) -> Result<DynamicImage, CropError> {
    let size = (image.width(), image.height());
    region.validate(size)?;

    if region.covers(size) {
        return Ok(image);
    }

    Ok(image.crop_imm(region.left, region.top, region.width, region.height))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CropError {
    #[error("Capture region has zero width or height")]
    ZeroDimension,

    #[error(
        "Capture region ({},{},{},{}) exceeds display bounds ({}x{})",
        requested.0, requested.1, requested.2, requested.3,
        image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: (u32, u32, u32, u32),
        image_size: (u32, u32),
    },
}

//! Object detection domain: public API.
//!
//! The capture loop talks to [`ObjectDetector`]; only the number of
//! detections matters to it. `client.rs` implements the trait against a
//! hosted inference HTTP API.

mod client;

pub use client::{encode_frame, parse_predictions, DetectionClient, RemoteDetector};

use crate::capture::Frame;

/// Axis-aligned box, centre-based as the inference service reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One detected object.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Runs detection on a single frame. Blocking; the caller owns the
/// thread it runs on.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Frame encoding failed: {0}")]
    Encoding(String),

    #[error("Detection request timed out")]
    Timeout,

    #[error("Detection request failed: {0}")]
    Request(String),

    #[error("Detection service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed detection response: {0}")]
    Malformed(String),

    #[error("Detection runtime unavailable: {0}")]
    Runtime(String),
}

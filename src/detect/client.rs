//! Hosted inference client (Roboflow-style object detection API).
//!
//! Request: `POST {api_url}/{model_id}?api_key=…[&confidence=…]` with
//! the base64 JPEG as a form-encoded body.
//! Response: `{"predictions": [{"x","y","width","height","confidence","class"}, …]}`.

use std::io::Cursor;
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use serde::Deserialize;

use super::{BoundingBox, Detection, DetectionError, ObjectDetector};
use crate::capture::Frame;
use crate::config::DetectionSettings;

/// Async HTTP client for the inference service.
pub struct DetectionClient {
    http: reqwest::Client,
    model_url: String,
    api_key: String,
    confidence: Option<u8>,
}

impl DetectionClient {
    pub fn new(settings: &DetectionSettings) -> Result<Self, DetectionError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DetectionError::Request(e.to_string()))?;

        Ok(Self {
            http,
            model_url: format!(
                "{}/{}",
                settings.api_url.trim_end_matches('/'),
                settings.model_id.trim_matches('/')
            ),
            api_key: settings.api_key.clone(),
            confidence: settings.confidence,
        })
    }

    /// Endpoint for the configured model, without credentials.
    pub fn model_url(&self) -> &str {
        &self.model_url
    }

    /// Run the model on one frame and return every detection.
    pub async fn infer(&self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        let start = Instant::now();
        let body = encode_frame(frame)?;
        let encode_ms = start.elapsed().as_millis();

        let mut query: Vec<(&str, String)> = vec![("api_key", self.api_key.clone())];
        if let Some(c) = self.confidence {
            query.push(("confidence", c.to_string()));
        }

        let response = self
            .http
            .post(&self.model_url)
            .query(&query)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;
        if !status.is_success() {
            return Err(DetectionError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let detections = parse_predictions(&text)?;
        log::debug!(
            "[DETECT] {} objects (encode {}ms, total {}ms)",
            detections.len(),
            encode_ms,
            start.elapsed().as_millis()
        );
        Ok(detections)
    }
}

fn request_error(e: reqwest::Error) -> DetectionError {
    if e.is_timeout() {
        DetectionError::Timeout
    } else {
        // without_url() keeps the api_key query parameter out of logs
        DetectionError::Request(e.without_url().to_string())
    }
}

/// JPEG-encode a frame (alpha dropped) and wrap it in base64.
pub fn encode_frame(frame: &Frame) -> Result<String, DetectionError> {
    let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());

    let mut jpeg_bytes: Vec<u8> = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut jpeg_bytes), ImageFormat::Jpeg)
        .map_err(|e| DetectionError::Encoding(e.to_string()))?;

    Ok(STANDARD.encode(&jpeg_bytes))
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    confidence: f64,
    #[serde(rename = "class", default)]
    label: String,
}

/// Parse the service's JSON body into detections.
pub fn parse_predictions(body: &str) -> Result<Vec<Detection>, DetectionError> {
    let parsed: InferenceResponse = serde_json::from_str(body).map_err(|e| {
        DetectionError::Malformed(format!(
            "{} (raw: {})",
            e,
            body.chars().take(200).collect::<String>()
        ))
    })?;

    Ok(parsed
        .predictions
        .into_iter()
        .map(|p| Detection {
            label: p.label,
            confidence: p.confidence,
            bbox: BoundingBox {
                x: p.x,
                y: p.y,
                width: p.width,
                height: p.height,
            },
        })
        .collect())
}

/// Blocking adapter: owns a current-thread tokio runtime and drives the
/// async client on whichever thread calls `detect`.
pub struct RemoteDetector {
    runtime: tokio::runtime::Runtime,
    client: DetectionClient,
}

impl RemoteDetector {
    pub fn new(client: DetectionClient) -> Result<Self, DetectionError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DetectionError::Runtime(e.to_string()))?;
        Ok(Self { runtime, client })
    }
}

impl ObjectDetector for RemoteDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        self.runtime.block_on(self.client.infer(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::time::Duration;

    fn settings(api_url: &str) -> DetectionSettings {
        DetectionSettings {
            api_url: api_url.to_string(),
            api_key: "test-key".to_string(),
            model_id: "valoaccuracy/5".to_string(),
            confidence: None,
            timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn parses_prediction_list() {
        let body = r#"{
            "time": 0.05,
            "image": {"width": 500, "height": 400},
            "predictions": [
                {"x": 10.0, "y": 20.0, "width": 30.0, "height": 40.0,
                 "confidence": 0.91, "class": "enemy", "class_id": 0},
                {"x": 1.5, "y": 2.5, "width": 3.0, "height": 4.0,
                 "confidence": 0.5, "class": "head"}
            ]
        }"#;
        let detections = parse_predictions(body).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "enemy");
        assert_eq!(detections[0].bbox.width, 30.0);
        assert_eq!(detections[1].confidence, 0.5);
    }

    #[test]
    fn empty_prediction_list_is_zero_objects() {
        assert!(parse_predictions(r#"{"predictions": []}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_predictions_is_malformed() {
        let result = parse_predictions(r#"{"message": "Forbidden"}"#);
        assert!(matches!(result, Err(DetectionError::Malformed(_))));
        let result = parse_predictions("<html>502</html>");
        assert!(matches!(result, Err(DetectionError::Malformed(_))));
    }

    #[test]
    fn encode_frame_produces_base64_jpeg() {
        let frame = DynamicImage::ImageRgba8(RgbaImage::new(16, 16));
        let encoded = encode_frame(&frame).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn model_url_joins_cleanly() {
        let client = DetectionClient::new(&settings("https://detect.example.com/")).unwrap();
        assert_eq!(client.model_url(), "https://detect.example.com/valoaccuracy/5");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_error() {
        // Port 9 (discard) on loopback is closed on test machines.
        let client = DetectionClient::new(&settings("http://127.0.0.1:9")).unwrap();
        let frame = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        let result = client.infer(&frame).await;
        assert!(matches!(
            result,
            Err(DetectionError::Request(_)) | Err(DetectionError::Timeout)
        ));
    }

    #[test]
    fn remote_detector_blocks_on_its_own_runtime() {
        let client = DetectionClient::new(&settings("http://127.0.0.1:9")).unwrap();
        let mut detector = RemoteDetector::new(client).unwrap();
        let frame = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        assert!(detector.detect(&frame).is_err());
    }
}

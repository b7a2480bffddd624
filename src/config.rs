//! Startup configuration, read once from the environment / `.env`.
//!
//! Nothing here is global: `Config::from_env()` builds a value that the
//! controller owns for the life of the process.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::capture::{RegionParseError, RegionSpec};
use crate::input::{HotkeyParseError, QuitCombo};
use crate::tracker::NoClickPolicy;

pub const DEFAULT_API_URL: &str = "https://detect.roboflow.com";
pub const DEFAULT_MODEL_ID: &str = "valoaccuracy/5";
pub const DEFAULT_LOG_FILE: &str = "app.log";
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_INTERVAL_MS: u64 = 100;

/// Everything the inference client needs.
#[derive(Clone)]
pub struct DetectionSettings {
    pub api_url: String,
    pub api_key: String,
    pub model_id: String,
    /// Minimum confidence (percent) the service should report.
    pub confidence: Option<u8>,
    pub timeout: Duration,
}

impl std::fmt::Debug for DetectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &format_args!("<{} chars>", self.api_key.len()))
            .field("model_id", &self.model_id)
            .field("confidence", &self.confidence)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where the running accuracy is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Transparent, click-through, always-on-top overlay.
    #[default]
    Overlay,
    /// Ordinary window showing the captured frame with the text burned in.
    Window,
    /// Log only.
    Headless,
}

impl FromStr for DisplayMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overlay" => Ok(Self::Overlay),
            "window" | "debug" => Ok(Self::Window),
            "headless" | "none" => Ok(Self::Headless),
            other => Err(ConfigError::Invalid {
                var: "DISPLAY_MODE",
                value: other.to_string(),
                reason: "expected overlay, window or headless".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub detection: DetectionSettings,
    pub region: RegionSpec,
    /// Sleep between iterations; zero lets detection latency pace the loop.
    pub capture_interval: Duration,
    pub no_click_policy: NoClickPolicy,
    pub quit_combo: QuitCombo,
    pub display_mode: DisplayMode,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Read the process environment. Call [`load_dotenv`] first to pick
    /// up `.env` files.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key → value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let api_key = match get("API_KEY") {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ConfigError::MissingApiKey),
        };

        let confidence = match get("DETECT_CONFIDENCE").filter(|v| !v.is_empty()) {
            Some(v) => {
                let pct: u8 = parse_var("DETECT_CONFIDENCE", &v)?;
                if pct > 100 {
                    return Err(ConfigError::Invalid {
                        var: "DETECT_CONFIDENCE",
                        value: v,
                        reason: "must be between 0 and 100".to_string(),
                    });
                }
                Some(pct)
            }
            None => None,
        };

        let timeout_ms = match get("DETECT_TIMEOUT_MS") {
            Some(v) => parse_var::<u64>("DETECT_TIMEOUT_MS", &v)?,
            None => DEFAULT_TIMEOUT_MS,
        };
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "DETECT_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "a detection timeout is required".to_string(),
            });
        }

        let interval_ms = match get("CAPTURE_INTERVAL_MS") {
            Some(v) => parse_var::<u64>("CAPTURE_INTERVAL_MS", &v)?,
            None => DEFAULT_INTERVAL_MS,
        };

        let region = match get("CAPTURE_REGION") {
            Some(v) => v.parse()?,
            None => RegionSpec::FullScreen,
        };

        let no_click = get("NO_CLICK_ACCURACY").map(|v| v.trim().to_ascii_lowercase());
        let no_click_policy = match no_click.as_deref() {
            None | Some("") | Some("optimistic") | Some("100") => NoClickPolicy::Optimistic,
            Some("zero") | Some("0") => NoClickPolicy::Zero,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "NO_CLICK_ACCURACY",
                    value: other.to_string(),
                    reason: "expected optimistic or zero".to_string(),
                })
            }
        };

        let quit_combo = match get("QUIT_HOTKEY").filter(|v| !v.is_empty()) {
            Some(v) => v.parse()?,
            None => QuitCombo::default(),
        };

        let display_mode = match get("DISPLAY_MODE").filter(|v| !v.is_empty()) {
            Some(v) => v.parse()?,
            None => DisplayMode::default(),
        };

        let log_file = match get("LOG_FILE") {
            Some(v) if v.is_empty() => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        };

        Ok(Config {
            detection: DetectionSettings {
                api_url: get("API_URL")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                api_key,
                model_id: get("MODEL_ID")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
                confidence,
                timeout: Duration::from_millis(timeout_ms),
            },
            region,
            capture_interval: Duration::from_millis(interval_ms),
            no_click_policy,
            quit_combo,
            display_mode,
            log_file,
        })
    }

    /// Upper bound on how long shutdown waits for the capture thread:
    /// one detection timeout plus slack for a capture and the throttle.
    pub fn join_timeout(&self) -> Duration {
        self.detection.timeout + self.capture_interval + Duration::from_secs(2)
    }
}

/// Load `.env` next to the executable, then from the working directory.
/// Variables already set are never overwritten.
///
/// Runs before the logger exists, so the outcome is returned for the
/// caller to log.
pub fn load_dotenv() -> Vec<Result<PathBuf, String>> {
    let mut loaded = Vec::new();

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
    {
        let path = dir.join(".env");
        if path.is_file() {
            loaded.push(
                dotenvy::from_path(&path)
                    .map(|()| path.clone())
                    .map_err(|e| format!("{}: {}", path.display(), e)),
            );
        }
    }

    match dotenvy::dotenv() {
        Ok(path) => loaded.push(Ok(path)),
        Err(e) if e.not_found() => {}
        Err(e) => loaded.push(Err(e.to_string())),
    }

    loaded
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: "not a valid number".to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API_KEY not found in environment or .env file")]
    MissingApiKey,

    #[error("Invalid {var}='{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Region(#[from] RegionParseError),

    #[error("Invalid QUIT_HOTKEY: {0}")]
    Hotkey(#[from] HotkeyParseError),
}

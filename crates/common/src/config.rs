//! Application configuration.
//!
//! Everything here is read once at startup. A running session never
//! re-reads or mutates its configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HandwaveError, HandwaveResult};

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timing of avatar responses.
    pub response: ResponseConfig,

    /// Frame pump pacing.
    pub feed: FeedConfig,

    /// Behavior id shown for each gesture.
    pub behaviors: BehaviorTable,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Crossfade and auto-revert timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Duration of a crossfade between two behaviors (ms).
    pub crossfade_ms: u64,

    /// Dwell on a gesture behavior before returning to idle (ms).
    pub auto_revert_ms: u64,

    /// Candidates scoring below this are read as "no gesture".
    pub min_gesture_confidence: f32,

    /// Shape of each per-asset opacity ramp.
    pub easing: EasingFunction,
}

/// Opacity ramp shape applied during a crossfade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingFunction {
    #[default]
    Linear,
    EaseInOut,
}

impl EasingFunction {
    /// Map `t` in `[0, 1]` onto the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingFunction::Linear => t,
            EasingFunction::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Detection feed pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Display refresh rate the pump follows once the source is ready (Hz).
    pub frame_rate_hz: u32,

    /// Retry interval while the source has no decodable data (ms).
    pub readiness_poll_ms: u64,
}

/// Behavior ids for every classifier outcome.
///
/// One field per gesture label, so a table can never leave a label unmapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorTable {
    /// Resting behavior: nobody in frame, and the auto-revert target.
    pub idle: String,
    /// A person is present but shows no gesture.
    pub waiting: String,
    pub thumb_up: String,
    pub thumb_down: String,
    pub closed_fist: String,
    pub open_palm: String,
    pub pointing_up: String,
    pub victory: String,
    pub ok: String,
    pub i_love_you: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "handwave=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            crossfade_ms: 500,
            auto_revert_ms: 3_000,
            min_gesture_confidence: 0.5,
            easing: EasingFunction::Linear,
        }
    }
}

impl ResponseConfig {
    pub fn crossfade_duration(&self) -> Duration {
        Duration::from_millis(self.crossfade_ms)
    }

    pub fn auto_revert_after(&self) -> Duration {
        Duration::from_millis(self.auto_revert_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 60,
            readiness_poll_ms: 100,
        }
    }
}

impl FeedConfig {
    /// Interval between pump iterations once the source is ready.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.frame_rate_hz.max(1) as u64)
    }

    pub fn readiness_poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }
}

impl Default for BehaviorTable {
    fn default() -> Self {
        Self {
            idle: "idle".to_string(),
            waiting: "waiting".to_string(),
            thumb_up: "thumbs-up".to_string(),
            thumb_down: "thumbs-down".to_string(),
            closed_fist: "fist-bump".to_string(),
            open_palm: "wave".to_string(),
            pointing_up: "point-up".to_string(),
            victory: "peace".to_string(),
            ok: "ok".to_string(),
            i_love_you: "heart".to_string(),
        }
    }
}

impl BehaviorTable {
    /// All configured behavior ids, resting behavior first.
    pub fn entries(&self) -> [(&'static str, &str); 10] {
        [
            ("idle", self.idle.as_str()),
            ("waiting", self.waiting.as_str()),
            ("thumb_up", self.thumb_up.as_str()),
            ("thumb_down", self.thumb_down.as_str()),
            ("closed_fist", self.closed_fist.as_str()),
            ("open_palm", self.open_palm.as_str()),
            ("pointing_up", self.pointing_up.as_str()),
            ("victory", self.victory.as_str()),
            ("ok", self.ok.as_str()),
            ("i_love_you", self.i_love_you.as_str()),
        ]
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            response: ResponseConfig::default(),
            feed: FeedConfig::default(),
            behaviors: BehaviorTable::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &std::path::Path) -> HandwaveResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> HandwaveResult<PathBuf> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }

    /// Reject values a session cannot run with.
    pub fn validate(&self) -> HandwaveResult<()> {
        if self.feed.frame_rate_hz == 0 {
            return Err(HandwaveError::config("feed.frame_rate_hz must be positive"));
        }
        if self.feed.readiness_poll_ms == 0 {
            return Err(HandwaveError::config(
                "feed.readiness_poll_ms must be positive",
            ));
        }
        let confidence = self.response.min_gesture_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(HandwaveError::config(format!(
                "response.min_gesture_confidence must be within [0, 1], got {confidence}"
            )));
        }
        if let Some((label, _)) = self
            .behaviors
            .entries()
            .into_iter()
            .find(|(_, id)| id.trim().is_empty())
        {
            return Err(HandwaveError::config(format!(
                "behaviors.{label} must not be empty"
            )));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("handwave").join("config.json")
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::arming::ArmingConfig;
use crate::domain::layout::{GestureBindings, LayoutSlot, TargetArea};

/// Tunables for stroke and hot-corner recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RecognizerConfig {
    /// Samples older than this (relative to the newest) leave the stroke buffer
    #[serde(with = "millis")]
    pub stroke_timeout: Duration,
    /// Minimum path length and net displacement of a swipe, in pixels
    pub min_distance: f64,
    /// Dominant-axis displacement must exceed this multiple of the cross axis
    pub dominance_ratio: f64,
    /// Distance from a monitor corner that still counts as "in the corner"
    pub corner_radius: f64,
    #[serde(with = "millis")]
    pub dwell_threshold: Duration,
}

impl RecognizerConfig {
    pub const DEFAULT_STROKE_TIMEOUT: Duration = Duration::from_millis(500);
    pub const DEFAULT_MIN_DISTANCE: f64 = 80.0;
    pub const DEFAULT_DOMINANCE_RATIO: f64 = 2.0;
    pub const DEFAULT_CORNER_RADIUS: f64 = 8.0;
    pub const DEFAULT_DWELL_THRESHOLD: Duration = Duration::from_millis(300);

    pub const MIN_STROKE_TIMEOUT: Duration = Duration::from_millis(50);
    pub const MAX_STROKE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MIN_DOMINANCE_RATIO: f64 = 1.0;
    pub const MAX_CORNER_RADIUS: f64 = 200.0;
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            stroke_timeout: Self::DEFAULT_STROKE_TIMEOUT,
            min_distance: Self::DEFAULT_MIN_DISTANCE,
            dominance_ratio: Self::DEFAULT_DOMINANCE_RATIO,
            corner_radius: Self::DEFAULT_CORNER_RADIUS,
            dwell_threshold: Self::DEFAULT_DWELL_THRESHOLD,
        }
    }
}

/// Pointer button whose press/release delimits a gesture stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GestureButton {
    Left,
    #[default]
    Right,
    Middle,
}

/// Listener lifecycle tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SupervisorConfig {
    /// Hook reinstall attempts after a resume before giving up
    pub rearm_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt
    #[serde(with = "millis")]
    pub rearm_backoff: Duration,
    /// Period of the clock tick that drives dwell and stroke expiry
    #[serde(with = "millis")]
    pub tick_interval: Duration,
    pub gesture_button: GestureButton,
}

impl SupervisorConfig {
    pub const DEFAULT_REARM_ATTEMPTS: u32 = 3;
    pub const DEFAULT_REARM_BACKOFF: Duration = Duration::from_millis(100);
    pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);
    pub const MAX_REARM_ATTEMPTS: u32 = 10;
    /// Cap on a single backoff wait; a pending stop waits for the re-arm
    pub const MAX_REARM_WAIT: Duration = Duration::from_secs(2);
    pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);
    pub const MAX_TICK_INTERVAL: Duration = Duration::from_millis(1000);

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.rearm_backoff.saturating_mul(1 << exponent).min(Self::MAX_REARM_WAIT)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            rearm_attempts: Self::DEFAULT_REARM_ATTEMPTS,
            rearm_backoff: Self::DEFAULT_REARM_BACKOFF,
            tick_interval: Self::DEFAULT_TICK_INTERVAL,
            gesture_button: GestureButton::default(),
        }
    }
}

/// Window placement policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ControllerConfig {
    /// Placement calls slower than this are logged as slow
    #[serde(with = "millis")]
    pub slow_call_threshold: Duration,
    /// Window classes that are never tiled (exact, case-insensitive)
    pub excluded_classes: Vec<String>,
    /// Windows whose title contains one of these fragments are never tiled
    pub excluded_titles: Vec<String>,
}

impl ControllerConfig {
    pub const DEFAULT_SLOW_CALL_THRESHOLD: Duration = Duration::from_millis(50);
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            slow_call_threshold: Self::DEFAULT_SLOW_CALL_THRESHOLD,
            excluded_classes: Vec::new(),
            excluded_titles: Vec::new(),
        }
    }
}

/// Layout slots and the gesture associations that target them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LayoutConfig {
    pub slots: Vec<LayoutSlot>,
    pub bindings: GestureBindings,
    pub area: TargetArea,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            slots: LayoutSlot::default_grid(),
            bindings: GestureBindings::default(),
            area: TargetArea::default(),
        }
    }
}

/// Complete configuration handed to the tiler at start
///
/// Reading it from disk belongs to the caller; the core only needs an
/// already well-formed value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TilerConfig {
    pub recognizer: RecognizerConfig,
    pub supervisor: SupervisorConfig,
    pub controller: ControllerConfig,
    pub layout: LayoutConfig,
    pub arming: ArmingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid tiler configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl TilerConfig {
    /// Parses a JSON document and clamps every numeric field into range
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TilerConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Returns a copy with every tunable clamped to a usable range
    pub fn sanitized(mut self) -> Self {
        let recognizer = &mut self.recognizer;
        recognizer.stroke_timeout = recognizer.stroke_timeout.clamp(
            RecognizerConfig::MIN_STROKE_TIMEOUT,
            RecognizerConfig::MAX_STROKE_TIMEOUT,
        );
        recognizer.min_distance = sanitize_positive(recognizer.min_distance, RecognizerConfig::DEFAULT_MIN_DISTANCE);
        recognizer.dominance_ratio = sanitize_positive(recognizer.dominance_ratio, RecognizerConfig::DEFAULT_DOMINANCE_RATIO)
            .max(RecognizerConfig::MIN_DOMINANCE_RATIO);
        recognizer.corner_radius = sanitize_positive(recognizer.corner_radius, RecognizerConfig::DEFAULT_CORNER_RADIUS)
            .min(RecognizerConfig::MAX_CORNER_RADIUS);

        let supervisor = &mut self.supervisor;
        supervisor.rearm_attempts = supervisor.rearm_attempts.clamp(1, SupervisorConfig::MAX_REARM_ATTEMPTS);
        supervisor.tick_interval = supervisor.tick_interval.clamp(
            SupervisorConfig::MIN_TICK_INTERVAL,
            SupervisorConfig::MAX_TICK_INTERVAL,
        );

        self.arming.window = self
            .arming
            .window
            .clamp(ArmingConfig::MIN_WINDOW, ArmingConfig::MAX_WINDOW);

        self
    }
}

fn sanitize_positive(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { fallback }
}

/// Serializes durations as whole milliseconds
pub(super) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gesture::GestureSymbol;

    #[test]
    fn defaults_match_documented_values() {
        let config = TilerConfig::default();
        assert_eq!(config.recognizer.stroke_timeout, Duration::from_millis(500));
        assert_eq!(config.recognizer.dwell_threshold, Duration::from_millis(300));
        assert_eq!(config.supervisor.rearm_attempts, 3);
        assert_eq!(config.controller.slow_call_threshold, Duration::from_millis(50));
        assert_eq!(config.layout.slots.len(), 8);
        assert!(config.arming.hotkey.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = TilerConfig::from_json_str(
            r#"{ "recognizer": { "min-distance": 120, "dwell-threshold": 450 } }"#,
        )
        .unwrap();

        assert_eq!(config.recognizer.min_distance, 120.0);
        assert_eq!(config.recognizer.dwell_threshold, Duration::from_millis(450));
        assert_eq!(config.recognizer.stroke_timeout, RecognizerConfig::DEFAULT_STROKE_TIMEOUT);
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn json_layout_and_bindings() {
        let config = TilerConfig::from_json_str(
            r#"{
                "supervisor": { "gesture-button": "middle" },
                "layout": {
                    "area": "work-area",
                    "slots": [ { "name": "wide", "x": 0.1, "y": 0.0, "width": 0.8, "height": 1.0 } ],
                    "bindings": { "swipe-up": "wide" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.supervisor.gesture_button, GestureButton::Middle);
        assert_eq!(config.layout.area, TargetArea::WorkArea);
        assert_eq!(config.layout.slots.len(), 1);
        assert_eq!(config.layout.bindings.slot_for(GestureSymbol::SwipeUp), Some("wide"));
        assert_eq!(config.layout.bindings.slot_for(GestureSymbol::SwipeLeft), None);
    }

    #[test]
    fn invalid_slot_is_rejected() {
        let result = TilerConfig::from_json_str(
            r#"{ "layout": { "slots": [ { "name": "bad", "x": 0.5, "y": 0.0, "width": 0.8, "height": 1.0 } ] } }"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut config = TilerConfig::default();
        config.recognizer.dominance_ratio = 0.2;
        config.recognizer.min_distance = f64::NAN;
        config.recognizer.stroke_timeout = Duration::from_millis(1);
        config.supervisor.rearm_attempts = 0;
        config.arming.window = Duration::ZERO;

        let config = config.sanitized();
        assert_eq!(config.recognizer.dominance_ratio, RecognizerConfig::MIN_DOMINANCE_RATIO);
        assert_eq!(config.recognizer.min_distance, RecognizerConfig::DEFAULT_MIN_DISTANCE);
        assert_eq!(config.recognizer.stroke_timeout, RecognizerConfig::MIN_STROKE_TIMEOUT);
        assert_eq!(config.supervisor.rearm_attempts, 1);
        assert_eq!(config.arming.window, ArmingConfig::MIN_WINDOW);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = SupervisorConfig::default();
        assert_eq!(config.backoff_after(1), Duration::from_millis(100));
        assert_eq!(config.backoff_after(2), Duration::from_millis(200));
        assert_eq!(config.backoff_after(3), Duration::from_millis(400));
        assert_eq!(config.backoff_after(9), SupervisorConfig::MAX_REARM_WAIT);
    }
}

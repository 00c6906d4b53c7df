//! Tunable configuration for the input pipeline.
//!
//! All values can be loaded from a TOML file in the user's config directory;
//! missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// All recognized pipeline tunables.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Axis deflection magnitude at which an axis-mapped button is considered pressed.
    pub press_threshold: f32,

    /// Gap between integration steps (milliseconds) above which displacement is
    /// discarded and the movement is treated as a fresh start.
    pub input_gap_ms: u64,

    /// Minimum displacement from the episode origin before a pointer episode is
    /// classified as a drag.
    pub drag_distance_px: f32,

    /// Minimum displacement from the episode origin before a pointer episode is
    /// classified as a fling.
    pub fling_distance_px: f32,

    /// Seconds for a fully deflected stick to traverse the shorter viewport axis.
    pub traversal_seconds: f32,

    /// Velocity multiplier applied while the fast-cursor button is held.
    pub fast_multiplier: f32,

    /// Duration (milliseconds) after which a motionless touch becomes a long touch.
    pub long_touch_threshold_ms: u64,

    /// Upper bound (milliseconds) on any emitted gesture duration.
    pub max_gesture_duration_ms: u64,

    /// Minimum fling velocity in pixels per second; drags are timed to stay
    /// just below it.
    pub min_fling_velocity: f32,

    /// Maximum fling velocity in pixels per second; flings are timed at it.
    pub max_fling_velocity: f32,

    /// Period of the repeating cursor integration tick, in milliseconds.
    pub tick_period_ms: u64,

    /// Convert drags to flings purely based on distance from the episode origin.
    pub use_distance_based_fling: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            press_threshold: 0.8,
            input_gap_ms: 150,
            drag_distance_px: 20.0,
            fling_distance_px: 150.0,
            traversal_seconds: 1.0,
            fast_multiplier: 2.0,
            long_touch_threshold_ms: 400,
            max_gesture_duration_ms: 59_999,
            min_fling_velocity: 50.0,
            max_fling_velocity: 8000.0,
            tick_period_ms: 10,
            use_distance_based_fling: false,
        }
    }
}

impl Config {
    /// Loads configuration from the given TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Loads configuration from the default location, falling back to defaults
    /// if no file exists.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Default config file path inside the user's config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("joycursor").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.traversal_seconds <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "traversal_seconds must be positive".to_string(),
            ));
        }
        if self.fast_multiplier <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "fast_multiplier must be positive".to_string(),
            ));
        }
        if self.min_fling_velocity <= 0.0 || self.max_fling_velocity <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "fling velocities must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.press_threshold) {
            return Err(ConfigError::InvalidValue(
                "press_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "tick_period_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str("drag_distance_px = 32.0").unwrap();
        assert_eq!(config.drag_distance_px, 32.0);
        assert_eq!(config.fling_distance_px, 150.0);
    }

    #[test]
    fn rejects_zero_traversal() {
        let config = Config {
            traversal_seconds: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config = Config {
            press_threshold: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}

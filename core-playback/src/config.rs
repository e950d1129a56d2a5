//! # Player Options
//!
//! Options accepted at setup and at runtime. Both arrive from the host as
//! JSON objects with camelCase keys; missing keys take their defaults.

use crate::error::{PlayerError, Result};
use bridge_traits::{Capability, EngineConfig, MediaSessionOptions, RatingType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of lanes every player runs.
pub const LANE_COUNT: usize = 2;

/// Setup options.
///
/// Durations are in seconds, the cache quota in KiB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOptions {
    /// Minimum media kept buffered ahead of the playhead.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_min_buffer")]
    pub min_buffer: f64,

    /// Maximum media buffered ahead of the playhead.
    ///
    /// Default: 50 seconds.
    #[serde(default = "default_max_buffer")]
    pub max_buffer: f64,

    /// Media required before playback starts. Twice this value is required
    /// before playback resumes after a stall.
    ///
    /// Default: 2.5 seconds.
    #[serde(default = "default_play_buffer")]
    pub play_buffer: f64,

    /// Quota for locally cached remote content, in KiB.
    ///
    /// Default: 0 (disabled).
    #[serde(default)]
    pub max_cache_size: f64,

    /// Requested lane count. Accepted for compatibility, capped at
    /// [`LANE_COUNT`] and otherwise ignored.
    #[serde(default)]
    pub lane_count: Option<usize>,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            min_buffer: default_min_buffer(),
            max_buffer: default_max_buffer(),
            play_buffer: default_play_buffer(),
            max_cache_size: 0.0,
            lane_count: None,
        }
    }
}

impl PlayerOptions {
    /// Parse and validate host options. `null` means all defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let options: Self = if value.is_null() {
            Self::default()
        } else {
            serde_json::from_value(value).map_err(|e| PlayerError::InvalidOptions(e.to_string()))?
        };
        options.validate()?;
        Ok(options)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("minBuffer", self.min_buffer),
            ("maxBuffer", self.max_buffer),
            ("playBuffer", self.play_buffer),
            ("maxCacheSize", self.max_cache_size),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlayerError::InvalidOptions(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }

        if self.min_buffer > self.max_buffer {
            return Err(PlayerError::InvalidOptions(
                "minBuffer cannot exceed maxBuffer".to_string(),
            ));
        }

        if let Some(count) = self.lane_count {
            if count > LANE_COUNT {
                return Err(PlayerError::InvalidOptions(format!(
                    "Player count cannot exceed {}",
                    LANE_COUNT
                )));
            }
        }

        self.engine_config().map(|_| ())
    }

    /// Lanes actually created. The requested count is not honored.
    pub fn lane_count(&self) -> usize {
        LANE_COUNT
    }

    /// Engine parameters derived from these options.
    ///
    /// Fails with `InvalidOptions` when a buffer does not fit a `Duration`.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let play_buffer = buffer_duration("playBuffer", self.play_buffer)?;
        let rebuffer = play_buffer.checked_mul(2).ok_or_else(|| {
            PlayerError::InvalidOptions("playBuffer is too large".to_string())
        })?;
        Ok(EngineConfig {
            min_buffer: buffer_duration("minBuffer", self.min_buffer)?,
            max_buffer: buffer_duration("maxBuffer", self.max_buffer)?,
            play_buffer,
            rebuffer,
            // Float-to-int casts saturate.
            cache_max_bytes: (self.max_cache_size * 1024.0) as u64,
        })
    }
}

/// Runtime options pushed through `updateOptions`.
///
/// Capabilities and the rating type use the integer constants published in
/// [`compatibility_table`](crate::constants::compatibility_table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptions {
    #[serde(default)]
    pub stop_with_app: bool,
    #[serde(default)]
    pub capabilities: Vec<i64>,
    #[serde(default)]
    pub rating_type: Option<i64>,
}

impl UpdateOptions {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| PlayerError::InvalidOptions(e.to_string()))
    }

    /// Resolve the integer constants into typed session options.
    pub fn media_session_options(&self) -> Result<MediaSessionOptions> {
        let capabilities = self
            .capabilities
            .iter()
            .map(|&code| {
                Capability::from_code(code).ok_or_else(|| {
                    PlayerError::InvalidOptions(format!("Unknown capability {}", code))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rating_type = match self.rating_type {
            Some(code) => RatingType::from_code(code).ok_or_else(|| {
                PlayerError::InvalidOptions(format!("Unknown rating type {}", code))
            })?,
            None => RatingType::default(),
        };

        Ok(MediaSessionOptions {
            stop_with_app: self.stop_with_app,
            capabilities,
            rating_type,
        })
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn buffer_duration(name: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| PlayerError::InvalidOptions(format!("{} is out of range", name)))
}

fn default_min_buffer() -> f64 {
    15.0
}

fn default_max_buffer() -> f64 {
    50.0
}

fn default_play_buffer() -> f64 {
    2.5
}

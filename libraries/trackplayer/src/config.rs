//! Player options
//!
//! Session defaults, loaded from an optional TOML file and `TRACKPLAYER_`
//! environment variables. Options live in memory for the session only.

use crate::buffer::BufferConfig;
use crate::error::{PlayerError, Result};
use crate::track::RatingType;
use crate::types::RepeatMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerOptions {
    /// Buffer durations used by `setup_with_defaults`
    #[serde(default)]
    pub buffer: BufferConfig,

    /// How long a load-type command waits for the engine
    #[serde(default = "default_engine_ack_timeout_ms")]
    pub engine_ack_timeout_ms: u64,

    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default)]
    pub rating_type: RatingType,

    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default = "default_rate")]
    pub rate: f32,

    #[serde(default)]
    pub repeat_mode: RepeatMode,

    #[serde(default)]
    pub play_when_ready: bool,
}

impl PlayerOptions {
    /// Load options from file and environment
    ///
    /// Environment variables override the file, e.g.
    /// `TRACKPLAYER_ENGINE_ACK_TIMEOUT_MS=2000` or
    /// `TRACKPLAYER_BUFFER__PLAY_BUFFER=1.5`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("TRACKPLAYER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let options: Self = settings
            .build()
            .map_err(|e| PlayerError::Options(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlayerError::Options(e.to_string()))?;

        options.validate()?;
        Ok(options)
    }

    /// Validate options
    pub fn validate(&self) -> Result<()> {
        if self.command_capacity == 0 {
            return Err(PlayerError::Options(
                "command_capacity must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(PlayerError::Options(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        if !self.volume.is_finite() {
            return Err(PlayerError::Options("volume must be finite".to_string()));
        }
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(PlayerError::Options("rate must be positive".to_string()));
        }

        Ok(())
    }

    pub fn engine_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_ack_timeout_ms)
    }
}

/// Options that can change while a session runs
///
/// Absent fields keep their current value. Buffer durations and channel
/// capacities are fixed once the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct OptionsUpdate {
    #[serde(default, alias = "ratingType")]
    pub rating_type: Option<RatingType>,

    #[serde(default, alias = "engineAckTimeoutMs")]
    pub engine_ack_timeout_ms: Option<u64>,
}

impl OptionsUpdate {
    /// Parse an update from untyped host input
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| PlayerError::Options(e.to_string()))
    }
}

// Default values
pub(crate) fn default_engine_ack_timeout_ms() -> u64 {
    5_000
}

fn default_command_capacity() -> usize {
    32
}

fn default_event_capacity() -> usize {
    64
}

fn default_volume() -> f32 {
    1.0
}

fn default_rate() -> f32 {
    1.0
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            engine_ack_timeout_ms: default_engine_ack_timeout_ms(),
            command_capacity: default_command_capacity(),
            event_capacity: default_event_capacity(),
            rating_type: RatingType::default(),
            volume: default_volume(),
            rate: default_rate(),
            repeat_mode: RepeatMode::default(),
            play_when_ready: false,
        }
    }
}

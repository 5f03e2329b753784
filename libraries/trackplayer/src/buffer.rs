//! Buffer policy validation
//!
//! Four buffering durations control playback liveness against memory and
//! network usage. They are checked once, when the policy is built, and the
//! resulting [`BufferPolicy`] is never partially updated afterwards.

use crate::error::BufferConfigError;
use serde::{Deserialize, Serialize};

/// Default minimum buffer (ms)
pub const DEFAULT_MIN_BUFFER_MS: i64 = 50_000;

/// Default maximum buffer (ms)
pub const DEFAULT_MAX_BUFFER_MS: i64 = 50_000;

/// Default buffer required before playback starts (ms)
pub const DEFAULT_PLAY_BUFFER_MS: i64 = 2_500;

/// Default back buffer (ms)
pub const DEFAULT_BACK_BUFFER_MS: i64 = 0;

/// Validated buffering thresholds
///
/// Invariant: `0 <= play_buffer_ms <= min_buffer_ms <= max_buffer_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferPolicy {
    min_buffer_ms: u64,
    max_buffer_ms: u64,
    play_buffer_ms: u64,
    back_buffer_ms: u64,
}

impl BufferPolicy {
    /// Validate millisecond values and build a policy
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// `play >= 0`, `back >= 0`, `play <= min`, `min <= max`.
    pub fn validate_and_build(
        min_ms: i64,
        max_ms: i64,
        play_ms: i64,
        back_ms: i64,
    ) -> Result<Self, BufferConfigError> {
        if play_ms < 0 {
            return Err(BufferConfigError::NegativePlayBuffer { play_ms });
        }
        if back_ms < 0 {
            return Err(BufferConfigError::NegativeBackBuffer { back_ms });
        }
        if play_ms > min_ms {
            return Err(BufferConfigError::PlayBufferExceedsMin { play_ms, min_ms });
        }
        if min_ms > max_ms {
            return Err(BufferConfigError::MinBufferExceedsMax { min_ms, max_ms });
        }

        // All four are non-negative once the chain above holds.
        Ok(Self {
            min_buffer_ms: min_ms as u64,
            max_buffer_ms: max_ms as u64,
            play_buffer_ms: play_ms as u64,
            back_buffer_ms: back_ms as u64,
        })
    }

    pub fn min_buffer_ms(&self) -> u64 {
        self.min_buffer_ms
    }

    pub fn max_buffer_ms(&self) -> u64 {
        self.max_buffer_ms
    }

    pub fn play_buffer_ms(&self) -> u64 {
        self.play_buffer_ms
    }

    pub fn back_buffer_ms(&self) -> u64 {
        self.back_buffer_ms
    }
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            min_buffer_ms: DEFAULT_MIN_BUFFER_MS as u64,
            max_buffer_ms: DEFAULT_MAX_BUFFER_MS as u64,
            play_buffer_ms: DEFAULT_PLAY_BUFFER_MS as u64,
            back_buffer_ms: DEFAULT_BACK_BUFFER_MS as u64,
        }
    }
}

/// Buffer settings as supplied by the host, in seconds
///
/// Missing values fall back to the engine defaults. Snake-case and
/// lowercased keys are accepted for options files and environment overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferConfig {
    #[serde(alias = "min_buffer", alias = "minbuffer")]
    pub min_buffer: Option<f64>,
    #[serde(alias = "max_buffer", alias = "maxbuffer")]
    pub max_buffer: Option<f64>,
    #[serde(alias = "play_buffer", alias = "playbuffer")]
    pub play_buffer: Option<f64>,
    #[serde(alias = "back_buffer", alias = "backbuffer")]
    pub back_buffer: Option<f64>,
}

impl BufferConfig {
    /// Convert to milliseconds and validate
    pub fn resolve(&self) -> Result<BufferPolicy, BufferConfigError> {
        let min = to_millis(self.min_buffer, "minBuffer", DEFAULT_MIN_BUFFER_MS)?;
        let max = to_millis(self.max_buffer, "maxBuffer", DEFAULT_MAX_BUFFER_MS)?;
        let play = to_millis(self.play_buffer, "playBuffer", DEFAULT_PLAY_BUFFER_MS)?;
        let back = to_millis(self.back_buffer, "backBuffer", DEFAULT_BACK_BUFFER_MS)?;

        BufferPolicy::validate_and_build(min, max, play, back)
    }
}

fn to_millis(
    seconds: Option<f64>,
    field: &'static str,
    default_ms: i64,
) -> Result<i64, BufferConfigError> {
    match seconds {
        None => Ok(default_ms),
        Some(secs) if secs.is_finite() => Ok((secs * 1000.0).round() as i64),
        Some(_) => Err(BufferConfigError::NotFinite { field }),
    }
}

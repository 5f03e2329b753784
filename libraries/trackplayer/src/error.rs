//! Error types for the track player

use thiserror::Error;

/// Buffer configuration errors
///
/// One variant per violated relation so callers can show an actionable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferConfigError {
    /// Play buffer is negative
    #[error("The value for playBuffer should be greater than or equal to zero (got {play_ms} ms)")]
    NegativePlayBuffer { play_ms: i64 },

    /// Back buffer is negative
    #[error("The value for backBuffer should be greater than or equal to zero (got {back_ms} ms)")]
    NegativeBackBuffer { back_ms: i64 },

    /// Play buffer is larger than min buffer
    #[error("The value for minBuffer ({min_ms} ms) should be greater than or equal to playBuffer ({play_ms} ms)")]
    PlayBufferExceedsMin { play_ms: i64, min_ms: i64 },

    /// Min buffer is larger than max buffer
    #[error("The value for maxBuffer ({max_ms} ms) should be greater than or equal to minBuffer ({min_ms} ms)")]
    MinBufferExceedsMax { min_ms: i64, max_ms: i64 },

    /// Seconds value cannot be converted to milliseconds
    #[error("The value for {field} must be a finite number of seconds")]
    NotFinite { field: &'static str },
}

impl BufferConfigError {
    /// Stable error code for the bridge
    pub fn code(&self) -> &'static str {
        match self {
            BufferConfigError::NegativePlayBuffer { .. } => "play_buffer_error",
            BufferConfigError::NegativeBackBuffer { .. } => "back_buffer_error",
            BufferConfigError::PlayBufferExceedsMin { .. } => "min_buffer_error",
            BufferConfigError::MinBufferExceedsMax { .. } => "max_buffer_error",
            BufferConfigError::NotFinite { .. } => "invalid_value",
        }
    }
}

/// Track player errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    /// Command issued before setup (or after teardown)
    #[error("The player is not initialized. Call setup first.")]
    NotInitialized,

    /// Setup called on an initialized player
    #[error("The player has already been initialized via setup.")]
    AlreadyInitialized,

    /// Index outside the queue
    #[error("The track index {index} is out of bounds (queue length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Track input could not be turned into a track
    #[error("Invalid track descriptor: {0}")]
    InvalidTrackDescriptor(String),

    /// Buffer configuration rejected
    #[error(transparent)]
    Config(#[from] BufferConfigError),

    /// Engine failed to start or load
    #[error("Playback engine failure: {reason}")]
    EngineFatal { reason: String },

    /// Nothing is loaded in the engine
    #[error("There is no current item in the player")]
    NoCurrentItem,

    /// Numeric argument outside its domain
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: f64 },

    /// Player options could not be loaded
    #[error("Invalid player options: {0}")]
    Options(String),
}

impl PlayerError {
    /// Stable error code for the bridge
    pub fn code(&self) -> &'static str {
        match self {
            PlayerError::NotInitialized => "player_not_initialized",
            PlayerError::AlreadyInitialized => "player_already_initialized",
            PlayerError::IndexOutOfBounds { .. } => "index_out_of_bounds",
            PlayerError::InvalidTrackDescriptor(_) => "invalid_track_object",
            PlayerError::Config(err) => err.code(),
            PlayerError::EngineFatal { .. } => "playback_error",
            PlayerError::NoCurrentItem => "no_current_item",
            PlayerError::InvalidValue { .. } => "invalid_value",
            PlayerError::Options(_) => "invalid_options",
        }
    }

    pub(crate) fn invalid_track(reason: impl Into<String>) -> Self {
        PlayerError::InvalidTrackDescriptor(reason.into())
    }
}

/// Result type for track player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_per_buffer_relation() {
        let errors = [
            BufferConfigError::NegativePlayBuffer { play_ms: -1 },
            BufferConfigError::NegativeBackBuffer { back_ms: -1 },
            BufferConfigError::PlayBufferExceedsMin {
                play_ms: 10,
                min_ms: 5,
            },
            BufferConfigError::MinBufferExceedsMax {
                min_ms: 10,
                max_ms: 5,
            },
        ];

        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn config_error_keeps_its_code_when_wrapped() {
        let err: PlayerError = BufferConfigError::MinBufferExceedsMax {
            min_ms: 1000,
            max_ms: 500,
        }
        .into();

        assert_eq!(err.code(), "max_buffer_error");
        assert!(err.to_string().contains("maxBuffer"));
    }
}

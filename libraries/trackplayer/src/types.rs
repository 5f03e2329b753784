//! Core types for the player surface

use crate::buffer::BufferPolicy;
use crate::config::PlayerOptions;
use crate::error::{PlayerError, Result};
use crate::events::NowPlaying;
use crate::state::PlaybackState;
use crate::track::{RatingType, Track};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Repeat mode
///
/// Decides what happens when the current item ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Reload the current track
    Track,

    /// Wrap to the first track after the last one
    Queue,
}

/// Playback progress in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub position: f64,
    pub duration: f64,
    pub buffered: f64,
}

/// Seconds as a `Duration`, rejecting values no `Duration` can hold
pub(crate) fn seconds(secs: f64, name: &'static str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| PlayerError::InvalidValue { name, value: secs })
}

/// Committed view of the player
///
/// Replaced as a whole by the owner task; readers never see a half-applied
/// command.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub initialized: bool,
    pub queue: Arc<[Track]>,
    pub active_index: Option<usize>,
    /// Track the engine is loaded with (a preview load or the active queue entry)
    pub active_track: Option<Track>,
    pub state: PlaybackState,
    pub progress: Progress,
    pub volume: f32,
    pub rate: f32,
    pub play_when_ready: bool,
    pub repeat_mode: RepeatMode,
    pub buffer_policy: Option<BufferPolicy>,
    pub now_playing: Option<NowPlaying>,
    /// How `rating` values in track input are read
    pub rating_type: RatingType,
    pub engine_ack_timeout_ms: u64,
}

impl PlayerSnapshot {
    /// Uninitialized snapshot carrying the session options
    pub(crate) fn with_options(options: &PlayerOptions) -> Self {
        Self {
            volume: options.volume,
            rate: options.rate,
            play_when_ready: options.play_when_ready,
            repeat_mode: options.repeat_mode,
            rating_type: options.rating_type,
            engine_ack_timeout_ms: options.engine_ack_timeout_ms,
            ..Self::default()
        }
    }

    pub fn engine_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_ack_timeout_ms)
    }
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            initialized: false,
            queue: Arc::from(Vec::new()),
            active_index: None,
            active_track: None,
            state: PlaybackState::Idle,
            progress: Progress::default(),
            volume: 1.0,
            rate: 1.0,
            play_when_ready: false,
            repeat_mode: RepeatMode::Off,
            buffer_policy: None,
            now_playing: None,
            rating_type: RatingType::default(),
            engine_ack_timeout_ms: crate::config::default_engine_ack_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RepeatMode::Queue).unwrap(),
            "\"queue\""
        );
        assert_eq!(
            serde_json::from_str::<RepeatMode>("\"track\"").unwrap(),
            RepeatMode::Track
        );
    }

    #[test]
    fn default_snapshot_is_uninitialized() {
        let snapshot = PlayerSnapshot::default();
        assert!(!snapshot.initialized);
        assert!(snapshot.queue.is_empty());
        assert_eq!(snapshot.state, PlaybackState::Idle);
    }
}
